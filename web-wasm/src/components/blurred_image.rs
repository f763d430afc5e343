//! ブラー付き画像コンポーネント
//!
//! 読込完了まではプレースホルダ、失敗時は画像もぼかしも出さずにエラー表示。

use bodyshop_gallery_common::overlay::placeholder_style;
use bodyshop_gallery_common::{plan_overlays, BlurZone, ImageLoadState, OverlayPlan};
use leptos::prelude::*;

#[component]
pub fn BlurredImage(
    src: String,
    zones: Vec<BlurZone>,
    #[prop(optional)] alt: String,
) -> impl IntoView {
    let (state, set_state) = signal(ImageLoadState::Loading);

    let plan = move || plan_overlays(state.get(), &zones);
    let image_style = move || match state.get() {
        ImageLoadState::Loaded => "display:block;width:100%;",
        // 読込イベントを受けるため要素は残す
        ImageLoadState::Loading => "display:block;width:100%;visibility:hidden;",
        ImageLoadState::Failed => "display:none;",
    };

    view! {
        <div class="blurred-image" style="position:relative;overflow:hidden;">
            <img
                src=src
                alt=alt
                style=image_style
                on:load=move |_| set_state.set(ImageLoadState::Loaded)
                on:error=move |_| set_state.set(ImageLoadState::Failed)
            />
            {move || match plan() {
                OverlayPlan::Placeholder => {
                    view! { <div class="image-placeholder" style=placeholder_style()></div> }.into_any()
                }
                OverlayPlan::Unavailable => {
                    view! { <div class="image-error">"画像を読み込めません"</div> }.into_any()
                }
                OverlayPlan::Overlays(boxes) => boxes
                    .into_iter()
                    .map(|b| view! { <div class="blur-overlay" style=b.style()></div> })
                    .collect_view()
                    .into_any(),
            }}
        </div>
    }
}
