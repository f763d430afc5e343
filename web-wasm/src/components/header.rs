//! ヘッダーコンポーネント

use leptos::prelude::*;

#[component]
pub fn Header() -> impl IntoView {
    view! {
        <header class="header">
            <h1>"ギャラリー管理 - 施工事例"</h1>
        </header>
    }
}
