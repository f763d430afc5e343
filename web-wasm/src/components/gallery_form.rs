//! ギャラリーアイテムの作成・編集フォーム

use crate::preview::ObjectUrl;
use bodyshop_gallery_common::GalleryItem;
use leptos::prelude::*;
use web_sys::HtmlInputElement;

#[component]
pub fn GalleryForm(
    /// 編集対象（None なら新規作成）
    initial: Option<GalleryItem>,
    on_submit: Callback<GalleryItem>,
    on_cancel: Callback<()>,
) -> impl IntoView {
    let is_new = initial.is_none();
    let base = initial.unwrap_or_default();

    let title = RwSignal::new(base.title.clone());
    let description = RwSignal::new(base.description.clone());
    let categories = RwSignal::new(join_list(base.categories.iter()));
    let tags = RwSignal::new(join_list(base.tags.iter()));
    let main_image = RwSignal::new(base.main_image.clone());
    let before_images = RwSignal::new(base.before_images.join("\n"));
    let after_images = RwSignal::new(base.after_images.join("\n"));

    // 差し替え・破棄で revoke される
    let preview = RwSignal::new(None::<ObjectUrl>);
    let (preview_error, set_preview_error) = signal(None::<String>);

    let on_file_change = move |ev: web_sys::Event| {
        let input: HtmlInputElement = event_target(&ev);
        let Some(file) = input.files().and_then(|files| files.get(0)) else {
            preview.set(None);
            return;
        };
        match ObjectUrl::from_blob(&file) {
            Ok(url) => {
                set_preview_error.set(None);
                preview.set(Some(url));
            }
            Err(e) => {
                web_sys::console::warn_1(&e.clone().into());
                set_preview_error.set(Some(e));
            }
        }
    };

    let preview_src = move || preview.with(|p| p.as_ref().map(|url| url.as_str().to_string()));

    let on_submit_click = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let mut item = base.clone();
        item.title = title.get_untracked().trim().to_string();
        item.description = description.get_untracked();
        item.categories = split_list(&categories.get_untracked()).into_iter().collect();
        item.tags = split_list(&tags.get_untracked());
        item.main_image = main_image.get_untracked().trim().to_string();
        item.before_images = split_lines(&before_images.get_untracked());
        item.after_images = split_lines(&after_images.get_untracked());
        on_submit.run(item);
    };

    view! {
        <form class="gallery-form" on:submit=on_submit_click>
            <h2>{if is_new { "施工事例の追加" } else { "施工事例の編集" }}</h2>

            <label>"タイトル"<input type="text" required bind:value=title /></label>
            <label>"説明"<textarea prop:value=move || description.get() on:input=move |ev| description.set(event_target_value(&ev))></textarea></label>
            <label>"カテゴリ（カンマ区切り）"<input type="text" bind:value=categories /></label>
            <label>"タグ（カンマ区切り）"<input type="text" bind:value=tags /></label>
            <label>"メイン画像"<input type="text" placeholder="/images/gallery/..." bind:value=main_image /></label>
            <label>"ビフォー画像（1行に1つ）"<textarea prop:value=move || before_images.get() on:input=move |ev| before_images.set(event_target_value(&ev))></textarea></label>
            <label>"アフター画像（1行に1つ）"<textarea prop:value=move || after_images.get() on:input=move |ev| after_images.set(event_target_value(&ev))></textarea></label>

            <label>
                "ローカル画像のプレビュー"
                <input type="file" accept="image/*" on:change=on_file_change />
            </label>
            {move || preview_src().map(|src| view! { <img class="form-preview" src=src /> })}
            {move || preview_error.get().map(|message| view! { <p class="status status-error">{message}</p> })}

            <div class="form-actions">
                <button type="submit" class="btn btn-primary">{if is_new { "作成" } else { "保存" }}</button>
                <button type="button" class="btn btn-secondary" on:click=move |_| on_cancel.run(())>"キャンセル"</button>
            </div>
        </form>
    }
}

fn join_list<'a>(values: impl Iterator<Item = &'a String>) -> String {
    values.cloned().collect::<Vec<_>>().join(", ")
}

/// カンマ区切り（全角読点も可）
fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', '、'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn split_lines(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("板金, 塗装、 ,修理"), vec!["板金", "塗装", "修理"]);
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(
            split_lines("/images/a.jpg\n\n  /images/b.jpg  \n"),
            vec!["/images/a.jpg", "/images/b.jpg"]
        );
    }
}
