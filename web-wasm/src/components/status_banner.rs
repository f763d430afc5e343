//! 状態表示（保存中・エラー）

use leptos::prelude::*;

/// 表示するメッセージ
#[derive(Clone, Debug, PartialEq)]
pub enum Status {
    Idle,
    Info(String),
    Error(String),
}

#[component]
pub fn StatusBanner(status: ReadSignal<Status>) -> impl IntoView {
    move || match status.get() {
        Status::Idle => ().into_any(),
        Status::Info(message) => view! { <div class="status status-info">{message}</div> }.into_any(),
        Status::Error(message) => view! { <div class="status status-error">"⚠ "{message}</div> }.into_any(),
    }
}
