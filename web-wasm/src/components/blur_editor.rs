//! ブラー領域エディタコンポーネント
//!
//! 画像の上でドラッグして矩形を描き、ハンドルで移動・リサイズ・回転する。
//! 状態遷移と当たり判定は共通ライブラリの EditorSession が持つ。

use bodyshop_gallery_common::editor::{EditorMode, HANDLE_TOLERANCE_PX, ROTATE_HANDLE_OFFSET_PX};
use bodyshop_gallery_common::overlay::css_number;
use bodyshop_gallery_common::{BlurEditor, CommitRequest, EditorState, Handle, Hit, ImageSize, PixelRect, Point};
use leptos::html::Div;
use leptos::prelude::*;
use web_sys::{HtmlImageElement, PointerEvent};

#[component]
pub fn BlurEditorView(
    editor: RwSignal<BlurEditor>,
    /// 保存要求（保存処理は呼び出し側）
    on_save: Callback<CommitRequest>,
    on_cancel: Callback<()>,
) -> impl IntoView {
    let container = NodeRef::<Div>::new();

    // 表示中の要素サイズを反映
    let sync_rendered_size = move || {
        if let Some(el) = container.get_untracked() {
            let rect = el.get_bounding_client_rect();
            let rendered = ImageSize::new(rect.width(), rect.height());
            editor.update(|e| {
                if let Some(session) = e.session_mut() {
                    session.set_rendered_size(rendered);
                }
            });
        }
    };

    let local_point = move |ev: &PointerEvent| -> Option<Point> {
        let el = container.get_untracked()?;
        let rect = el.get_bounding_client_rect();
        Some(Point::new(
            ev.client_x() as f64 - rect.left(),
            ev.client_y() as f64 - rect.top(),
        ))
    };

    let on_image_load = move |ev: web_sys::Event| {
        let img: HtmlImageElement = event_target(&ev);
        let natural = ImageSize::new(img.natural_width() as f64, img.natural_height() as f64);
        let rendered = ImageSize::new(img.client_width() as f64, img.client_height() as f64);
        editor.update(|e| {
            if let Some(session) = e.session_mut() {
                session.image_loaded(natural, rendered);
            }
        });
    };

    let on_pointer_down = move |ev: PointerEvent| {
        if editor.with_untracked(|e| e.is_saving()) {
            return;
        }
        sync_rendered_size();
        let Some(p) = local_point(&ev) else { return };
        ev.prevent_default();
        if let Some(el) = container.get_untracked() {
            let _ = el.set_pointer_capture(ev.pointer_id());
        }
        editor.update(|e| {
            if let Some(session) = e.session_mut() {
                session.pointer_down(p);
            }
        });
    };

    let (cursor, set_cursor) = signal(cursor_for(None));
    let on_pointer_move = move |ev: PointerEvent| {
        let Some(p) = local_point(&ev) else { return };
        if editor.with_untracked(|e| e.state()) == EditorState::Idle {
            // ホバー中はカーソルだけ変える
            let hit = editor.with_untracked(|e| e.session().and_then(|s| s.hit_test(p)));
            set_cursor.set(cursor_for(hit));
            return;
        }
        editor.update(|e| {
            if let Some(session) = e.session_mut() {
                session.pointer_move(p);
            }
        });
    };

    let on_pointer_up = move |ev: PointerEvent| {
        let Some(p) = local_point(&ev) else { return };
        editor.update(|e| {
            if let Some(session) = e.session_mut() {
                session.pointer_up(p);
            }
        });
    };

    let on_pointer_cancel = move |_: PointerEvent| {
        editor.update(|e| {
            if let Some(session) = e.session_mut() {
                session.cancel_gesture();
            }
        });
    };

    let on_key_down = move |ev: web_sys::KeyboardEvent| match ev.key().as_str() {
        "Escape" => editor.update(|e| {
            if let Some(session) = e.session_mut() {
                session.cancel_gesture();
            }
        }),
        "Delete" | "Backspace" => editor.update(|e| {
            if let Some(session) = e.session_mut() {
                if let Some(index) = session.selected() {
                    let _ = session.remove_zone(index);
                }
            }
        }),
        _ => {}
    };

    let image_path = move || {
        editor.with(|e| e.session().map(|s| s.image_path().to_string()).unwrap_or_default())
    };

    // 表示座標の矩形（選択中の印付き）
    let screen_zones = move || {
        editor.with(|e| {
            e.session()
                .map(|s| {
                    let mut zones: Vec<(PixelRect, bool)> = s
                        .screen_zones()
                        .into_iter()
                        .enumerate()
                        .map(|(i, r)| (r, s.selected() == Some(i)))
                        .collect();
                    if let Some(preview) = s.drawing_preview().and_then(|r| s.to_screen(&r)) {
                        zones.push((preview, true));
                    }
                    zones
                })
                .unwrap_or_default()
        })
    };

    let selected_blur = move || {
        editor.with(|e| {
            e.session()
                .and_then(|s| s.selected().and_then(|i| s.zones().get(i)).map(|z| z.blur_amount))
        })
    };

    let on_blur_input = move |ev: web_sys::Event| {
        if let Ok(amount) = event_target_value(&ev).parse::<f64>() {
            editor.update(|e| {
                if let Some(session) = e.session_mut() {
                    if let Some(index) = session.selected() {
                        let _ = session.set_blur_amount(index, amount);
                    }
                }
            });
        }
    };

    let on_remove = move |_: web_sys::MouseEvent| {
        editor.update(|e| {
            if let Some(session) = e.session_mut() {
                if let Some(index) = session.selected() {
                    let _ = session.remove_zone(index);
                }
            }
        });
    };

    let on_clear = move |_: web_sys::MouseEvent| {
        editor.update(|e| {
            if let Some(session) = e.session_mut() {
                session.clear();
            }
        });
    };

    let (error, set_error) = signal(None::<String>);
    let on_save_click = move |_: web_sys::MouseEvent| {
        let mut result = None;
        editor.update(|e| result = Some(e.begin_save()));
        match result {
            Some(Ok(request)) => {
                set_error.set(None);
                on_save.run(request);
            }
            Some(Err(e)) => set_error.set(Some(e.to_string())),
            None => {}
        }
    };

    let is_saving = move || editor.with(|e| e.is_saving());
    let is_loaded = move || editor.with(|e| e.session().map_or(false, |s| s.is_loaded()));
    let surface_style = move || {
        format!(
            "position:relative;display:inline-block;touch-action:none;user-select:none;cursor:{};",
            cursor.get()
        )
    };

    view! {
        <div class="blur-editor" tabindex="0" on:keydown=on_key_down>
            <div
                class="blur-editor-surface"
                node_ref=container
                style=surface_style
                on:pointerdown=on_pointer_down
                on:pointermove=on_pointer_move
                on:pointerup=on_pointer_up
                on:pointercancel=on_pointer_cancel
            >
                <img
                    src=image_path
                    draggable="false"
                    style="display:block;max-width:100%;pointer-events:none;"
                    on:load=on_image_load
                />
                <Show when=move || !is_loaded()>
                    <div class="image-placeholder" style="position:absolute;inset:0;">"読込中..."</div>
                </Show>
                <For
                    each=move || screen_zones().into_iter().enumerate().collect::<Vec<_>>()
                    key=|(i, (r, selected))| {
                        (*i, css_number(r.x), css_number(r.y), css_number(r.width), css_number(r.height), css_number(r.rotation), css_number(r.blur_amount), *selected)
                    }
                    children=move |(_, (rect, selected))| view! { <ZoneBox rect=rect selected=selected /> }
                />
            </div>

            <div class="blur-editor-toolbar">
                <span class="editor-mode">{move || editor.with(mode_label)}</span>
                <label>
                    "ぼかし量 "
                    <input
                        type="range"
                        min="0"
                        max="40"
                        step="1"
                        disabled=move || selected_blur().is_none()
                        prop:value=move || selected_blur().map(|b| b.to_string()).unwrap_or_default()
                        on:input=on_blur_input
                    />
                </label>
                <button class="btn btn-small" disabled=move || selected_blur().is_none() on:click=on_remove>
                    "選択を削除"
                </button>
                <button class="btn btn-small btn-tertiary" on:click=on_clear>"すべて削除"</button>
                <button class="btn btn-primary" disabled=move || is_saving() || !is_loaded() on:click=on_save_click>
                    {move || if is_saving() { "保存中..." } else { "保存" }}
                </button>
                <button class="btn btn-secondary" disabled=is_saving on:click=move |_| on_cancel.run(())>
                    "閉じる"
                </button>
            </div>

            {move || error.get().map(|message| view! { <p class="status status-error">{message}</p> })}
        </div>
    }
}

/// 1つの矩形（表示座標、px）
#[component]
fn ZoneBox(rect: PixelRect, selected: bool) -> impl IntoView {
    let blur = format!("blur({}px)", css_number(rect.blur_amount));
    let style = format!(
        "position:absolute;left:{}px;top:{}px;width:{}px;height:{}px;\
         transform:rotate({}deg);transform-origin:center;\
         backdrop-filter:{blur};-webkit-backdrop-filter:{blur};\
         border:1px {} rgba(37,99,235,0.9);pointer-events:none;",
        css_number(rect.x),
        css_number(rect.y),
        css_number(rect.width),
        css_number(rect.height),
        css_number(rect.rotation),
        if selected { "solid" } else { "dashed" },
    );

    let handle_size = HANDLE_TOLERANCE_PX;
    let handles = if selected {
        Handle::ALL
            .iter()
            .map(|handle| {
                let (left, top) = handle_position(handle, &rect);
                let style = format!(
                    "position:absolute;left:{}px;top:{}px;width:{s}px;height:{s}px;\
                     margin:-{h}px 0 0 -{h}px;background:#fff;border:1px solid #2563eb;cursor:{};",
                    css_number(left),
                    css_number(top),
                    handle.cursor(),
                    s = css_number(handle_size),
                    h = css_number(handle_size / 2.0),
                );
                view! { <div class="zone-handle" style=style></div> }
            })
            .collect_view()
            .into_any()
    } else {
        ().into_any()
    };

    let rotate_style = format!(
        "position:absolute;left:50%;top:-{}px;width:{s}px;height:{s}px;margin-left:-{h}px;\
         border-radius:50%;background:#2563eb;",
        css_number(ROTATE_HANDLE_OFFSET_PX + handle_size / 2.0),
        s = css_number(handle_size),
        h = css_number(handle_size / 2.0),
    );

    view! {
        <div class="blur-zone" class:selected=selected style=style>
            {handles}
            <Show when=move || selected>
                <div class="zone-rotate-handle" style=rotate_style.clone()></div>
            </Show>
        </div>
    }
}

/// 矩形内（回転前）のハンドル位置
fn handle_position(handle: &Handle, rect: &PixelRect) -> (f64, f64) {
    let (w, h) = (rect.width, rect.height);
    match handle {
        Handle::NorthWest => (0.0, 0.0),
        Handle::North => (w / 2.0, 0.0),
        Handle::NorthEast => (w, 0.0),
        Handle::East => (w, h / 2.0),
        Handle::SouthEast => (w, h),
        Handle::South => (w / 2.0, h),
        Handle::SouthWest => (0.0, h),
        Handle::West => (0.0, h / 2.0),
    }
}

/// 現在のモード名（ツールバー表示用）
fn mode_label(editor: &BlurEditor) -> &'static str {
    match editor.session().map(|s| s.mode()) {
        None => "",
        Some(EditorMode::Idle) => "選択",
        Some(EditorMode::Drawing { .. }) => "描画中",
        Some(EditorMode::Adjusting { .. }) => "調整中",
    }
}

/// 当たり判定の結果からカーソルを決める
fn cursor_for(hit: Option<Hit>) -> &'static str {
    match hit {
        Some(Hit::Handle(_, handle)) => handle.cursor(),
        Some(Hit::Rotate(_)) => "grab",
        Some(Hit::Body(_)) => "move",
        None => "crosshair",
    }
}
