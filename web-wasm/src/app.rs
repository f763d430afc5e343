//! メインアプリケーションコンポーネント

use crate::api::gallery::GalleryApi;
use crate::components::{
    blur_editor::BlurEditorView,
    gallery_form::GalleryForm,
    gallery_list::GalleryList,
    header::Header,
    status_banner::{Status, StatusBanner},
};
use bodyshop_gallery_common::{BlurEditor, CommitRequest, GalleryItem, ImageSize, PathNormalizer, SaveContext};
use leptos::prelude::*;
use leptos::task::spawn_local;

/// 表示中の画面
#[derive(Clone, Debug, PartialEq)]
pub enum Screen {
    List,
    Form(Option<GalleryItem>),
    /// ブラー編集中のアイテム
    Blur(GalleryItem),
}

/// 現在時刻（RFC 3339）
fn now_timestamp() -> String {
    String::from(js_sys::Date::new_0().to_iso_string())
}

fn warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

/// 作成日時の新しい順
fn sort_items(items: &mut [GalleryItem]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

fn replace_item(items: &mut Vec<GalleryItem>, item: GalleryItem) {
    match items.iter_mut().find(|i| i.id == item.id) {
        Some(slot) => *slot = item,
        None => {
            items.push(item);
            sort_items(items);
        }
    }
}

#[component]
pub fn App() -> impl IntoView {
    let api = StoredValue::new(GalleryApi::same_origin());
    let normalizer = StoredValue::new(PathNormalizer::default());
    // 一覧・エディタで同じ正規化器を使う
    provide_context(normalizer);

    let (items, set_items) = signal(Vec::<GalleryItem>::new());
    let (status, set_status) = signal(Status::Idle);
    let (screen, set_screen) = signal(Screen::List);
    let editor = RwSignal::new(BlurEditor::new());

    let reload = move || {
        let api = api.get_value();
        set_status.set(Status::Info("読込中...".into()));
        spawn_local(async move {
            match api.list().await {
                Ok(mut list) => {
                    sort_items(&mut list);
                    set_items.set(list);
                    set_status.set(Status::Idle);
                }
                Err(e) => set_status.set(Status::Error(format!("一覧を取得できません: {}", e))),
            }
        });
    };
    reload();

    let on_edit = Callback::new(move |item: GalleryItem| set_screen.set(Screen::Form(Some(item))));

    let on_delete = Callback::new(move |item: GalleryItem| {
        if !confirm(&format!("「{}」を削除しますか？", item.title)) {
            return;
        }
        let api = api.get_value();
        spawn_local(async move {
            match api.delete(&item.id).await {
                Ok(()) => {
                    set_items.update(|list| list.retain(|i| i.id != item.id));
                    set_status.set(Status::Info("削除しました".into()));
                }
                Err(e) => set_status.set(Status::Error(format!("削除できません: {}", e))),
            }
        });
    });

    let on_submit = Callback::new(move |mut item: GalleryItem| {
        let api = api.get_value();
        let now = now_timestamp();
        for (_, path) in item.image_paths() {
            if let Some(warning) = normalizer.with_value(|n| n.normalize_with_report(path).warning) {
                warn(&warning.to_string());
            }
        }
        // 外した画像のブラー領域は一緒に消す
        if let Some(previous) = items.with_untracked(|list| list.iter().find(|i| i.id == item.id).cloned()) {
            normalizer.with_value(|n| item.drop_removed_image_zones(&previous, n));
        }
        spawn_local(async move {
            let result = if item.id.is_empty() {
                item.created_at = Some(now.clone());
                item.updated_at = Some(now);
                api.create(&item).await
            } else {
                item.updated_at = Some(now);
                api.update(&item).await
            };
            match result {
                Ok(saved) => {
                    set_items.update(|list| replace_item(list, saved));
                    set_screen.set(Screen::List);
                    set_status.set(Status::Info("保存しました".into()));
                }
                Err(e) => set_status.set(Status::Error(format!("保存できません: {}", e))),
            }
        });
    });

    let on_edit_blur = Callback::new(move |(item, path): (GalleryItem, String)| {
        let resolution = normalizer.with_value(|n| item.blur_areas.resolve(n, &path));
        if resolution.is_heuristic() {
            warn(&format!(
                "ファイル名のみで一致したブラー領域を読み込みました: {} → {:?}",
                path, resolution.matched_key
            ));
        }
        let mut opened = Ok(());
        editor.update(|e| {
            opened = e.open(path, resolution, None, ImageSize::new(0.0, 0.0)).map(|_| ());
        });
        match opened {
            Ok(()) => set_screen.set(Screen::Blur(item)),
            Err(e) => set_status.set(Status::Error(e.to_string())),
        }
    });

    let on_blur_cancel = Callback::new(move |_: ()| {
        let dirty = editor.with_untracked(|e| e.session().map_or(false, |s| s.is_dirty()));
        if dirty && !confirm("保存していない変更を破棄しますか？") {
            return;
        }
        editor.update(|e| {
            e.close();
        });
        set_screen.set(Screen::List);
    });

    // 先に一覧へ反映し、失敗したら戻す
    let on_blur_save = Callback::new(move |request: CommitRequest| {
        let Screen::Blur(item) = screen.get_untracked() else {
            editor.update(|e| e.finish_save(false));
            return;
        };

        let now = now_timestamp();
        let mut updated = item.clone();
        let applied = normalizer.with_value(|n| {
            let ctx = SaveContext::new(now.clone()).with_role(item.role_of(n, &request.image_path));
            request.apply(&mut updated.blur_areas, n, &ctx)
        });
        if let Err(e) = applied {
            editor.update(|e| e.finish_save(false));
            set_status.set(Status::Error(e.to_string()));
            return;
        }
        updated.updated_at = Some(now);

        let previous = items.get_untracked();
        set_items.update(|list| replace_item(list, updated.clone()));
        set_status.set(Status::Info("保存中...".into()));

        let api = api.get_value();
        spawn_local(async move {
            match api.update(&updated).await {
                Ok(saved) => {
                    set_items.update(|list| replace_item(list, saved));
                    editor.update(|e| e.finish_save(true));
                    set_screen.set(Screen::List);
                    set_status.set(Status::Info("ブラー領域を保存しました".into()));
                }
                Err(e) => {
                    set_items.set(previous);
                    editor.update(|e| e.finish_save(false));
                    set_status.set(Status::Error(format!("ブラー領域を保存できません: {}", e)));
                }
            }
        });
    });

    view! {
        <div class="container">
            <Header />
            <StatusBanner status=status />

            {move || match screen.get() {
                Screen::List => view! {
                    <div class="toolbar">
                        <button class="btn btn-primary" on:click=move |_| set_screen.set(Screen::Form(None))>"追加"</button>
                        <button class="btn btn-secondary" on:click=move |_| reload()>"再読込"</button>
                    </div>
                    <GalleryList items=items on_edit=on_edit on_delete=on_delete on_edit_blur=on_edit_blur />
                }
                .into_any(),
                Screen::Form(initial) => view! {
                    <GalleryForm
                        initial=initial
                        on_submit=on_submit
                        on_cancel=Callback::new(move |_: ()| set_screen.set(Screen::List))
                    />
                }
                .into_any(),
                Screen::Blur(item) => view! {
                    <h2>{item.title}</h2>
                    <BlurEditorView editor=editor on_save=on_blur_save on_cancel=on_blur_cancel />
                }
                .into_any(),
            }}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, created_at: &str) -> GalleryItem {
        GalleryItem {
            id: id.into(),
            created_at: Some(created_at.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_replace_item_keeps_order() {
        let mut list = vec![item("b", "2024-02-01T00:00:00Z"), item("a", "2024-01-01T00:00:00Z")];
        let mut edited = item("a", "2024-01-01T00:00:00Z");
        edited.title = "更新".into();
        replace_item(&mut list, edited);
        assert_eq!(list[1].title, "更新");

        replace_item(&mut list, item("c", "2024-03-01T00:00:00Z"));
        assert_eq!(list.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(), ["c", "b", "a"]);
    }
}
