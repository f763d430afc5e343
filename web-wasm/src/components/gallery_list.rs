//! ギャラリー一覧コンポーネント

use crate::components::blurred_image::BlurredImage;
use bodyshop_gallery_common::{GalleryItem, ImageRole, PathNormalizer};
use leptos::prelude::*;

#[component]
pub fn GalleryList(
    items: ReadSignal<Vec<GalleryItem>>,
    on_edit: Callback<GalleryItem>,
    on_delete: Callback<GalleryItem>,
    /// (アイテム, 画像パス) でブラー編集を開く
    on_edit_blur: Callback<(GalleryItem, String)>,
) -> impl IntoView {
    view! {
        <div class="gallery-list">
            <Show
                when=move || !items.get().is_empty()
                fallback=|| view! { <p class="text-muted">"施工事例はまだありません"</p> }
            >
                <For
                    // 更新のたびにカードを作り直す
                    each=move || items.get()
                    key=|item| (item.id.clone(), item.updated_at.clone())
                    children=move |item| view! {
                        <GalleryCard item=item on_edit=on_edit on_delete=on_delete on_edit_blur=on_edit_blur />
                    }
                />
            </Show>
        </div>
    }
}

#[component]
fn GalleryCard(
    item: GalleryItem,
    on_edit: Callback<GalleryItem>,
    on_delete: Callback<GalleryItem>,
    on_edit_blur: Callback<(GalleryItem, String)>,
) -> impl IntoView {
    let normalizer = use_context::<StoredValue<PathNormalizer>>()
        .unwrap_or_else(|| StoredValue::new(PathNormalizer::default()));

    let images: Vec<(ImageRole, String, Vec<_>)> = normalizer.with_value(|n| {
        item.image_paths()
            .into_iter()
            .map(|(role, path)| {
                let zones = item.blur_areas.resolve(n, path).zones;
                (role, path.to_string(), zones)
            })
            .collect()
    });

    let thumbnails = images
        .into_iter()
        .map(|(role, path, zones)| {
            let target = (item.clone(), path.clone());
            view! {
                <figure class="gallery-thumb" data-role=role.as_str()>
                    <BlurredImage src=path zones=zones />
                    <figcaption>
                        {role_label(role)}
                        <button class="btn btn-small" on:click=move |_| on_edit_blur.run(target.clone())>
                            "ぼかし"
                        </button>
                    </figcaption>
                </figure>
            }
        })
        .collect_view();

    let categories = item.categories.iter().cloned().collect::<Vec<_>>().join(" / ");
    let edit_target = item.clone();
    let delete_target = item.clone();

    view! {
        <article class="gallery-card">
            <header class="gallery-card-header">
                <h3>{item.title.clone()}</h3>
                <span class="text-muted">{categories}</span>
            </header>
            <p class="gallery-card-description">{item.description.clone()}</p>
            <div class="gallery-thumbs">{thumbnails}</div>
            <div class="gallery-card-actions">
                <button class="btn btn-secondary" on:click=move |_| on_edit.run(edit_target.clone())>"編集"</button>
                <button class="btn btn-danger" on:click=move |_| on_delete.run(delete_target.clone())>"削除"</button>
            </div>
        </article>
    }
}

fn role_label(role: ImageRole) -> &'static str {
    match role {
        ImageRole::Main => "メイン",
        ImageRole::Before => "ビフォー",
        ImageRole::After => "アフター",
    }
}
