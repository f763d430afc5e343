//! ブラーオーバーレイ描画計画
//!
//! 画像の上に重ねるブラー矩形の配置とCSSを作る。
//! 位置・サイズは%なので表示サイズが変わっても追従する。
//! 画像読込中はプレースホルダ、読込失敗時はオーバーレイを出さない。

use crate::types::BlurZone;

/// 画像の読込状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageLoadState {
    #[default]
    Loading,
    Loaded,
    Failed,
}

/// 1つのオーバーレイ（%と度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub blur_amount: f64,
}

impl OverlayBox {
    pub fn from_zone(zone: &BlurZone) -> Self {
        Self {
            left: zone.x,
            top: zone.y,
            width: zone.width,
            height: zone.height,
            rotation: zone.rotation,
            blur_amount: zone.blur_amount,
        }
    }

    /// インラインCSS
    pub fn style(&self) -> String {
        let blur = format!("blur({}px)", css_number(self.blur_amount));
        format!(
            "position:absolute;left:{}%;top:{}%;width:{}%;height:{}%;\
             transform:rotate({}deg);transform-origin:center;\
             backdrop-filter:{blur};-webkit-backdrop-filter:{blur};\
             background-color:rgba(255,255,255,0.05);pointer-events:none;",
            css_number(self.left),
            css_number(self.top),
            css_number(self.width),
            css_number(self.height),
            css_number(self.rotation),
        )
    }
}

/// 描画計画
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayPlan {
    /// 読込中（画像の代わりにプレースホルダ）
    Placeholder,
    /// 画像＋オーバーレイ
    Overlays(Vec<OverlayBox>),
    /// 読込失敗（画像もオーバーレイも出さない）
    Unavailable,
}

impl OverlayPlan {
    pub fn overlays(&self) -> &[OverlayBox] {
        match self {
            OverlayPlan::Overlays(boxes) => boxes,
            _ => &[],
        }
    }

    pub fn shows_image(&self) -> bool {
        matches!(self, OverlayPlan::Overlays(_))
    }
}

/// 読込状態とブラー領域から描画計画を作る
///
/// 範囲外の領域は画像内に切り詰め、面積ゼロや非数値の領域は捨てる。
pub fn plan_overlays(state: ImageLoadState, zones: &[BlurZone]) -> OverlayPlan {
    match state {
        ImageLoadState::Loading => OverlayPlan::Placeholder,
        ImageLoadState::Failed => OverlayPlan::Unavailable,
        ImageLoadState::Loaded => OverlayPlan::Overlays(
            zones
                .iter()
                .filter_map(BlurZone::clamped)
                .map(|z| OverlayBox::from_zone(&z))
                .collect(),
        ),
    }
}

/// 読込中プレースホルダのCSS
pub fn placeholder_style() -> &'static str {
    "position:absolute;inset:0;background-color:#e5e7eb;"
}

/// CSS用の数値（小数4桁まで、末尾の0は省く）
pub fn css_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let s = format!("{:.4}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_shows_placeholder() {
        let zones = vec![BlurZone::new(10.0, 10.0, 5.0, 5.0)];
        assert_eq!(plan_overlays(ImageLoadState::Loading, &zones), OverlayPlan::Placeholder);
    }

    #[test]
    fn test_failed_shows_nothing() {
        let zones = vec![BlurZone::new(10.0, 10.0, 5.0, 5.0)];
        let plan = plan_overlays(ImageLoadState::Failed, &zones);
        assert_eq!(plan, OverlayPlan::Unavailable);
        assert!(plan.overlays().is_empty());
        assert!(!plan.shows_image());
    }

    #[test]
    fn test_loaded_overlay_style() {
        let zones = vec![BlurZone::new(10.0, 20.0, 30.0, 40.0)
            .with_rotation(15.0)
            .with_blur_amount(12.0)];
        let plan = plan_overlays(ImageLoadState::Loaded, &zones);
        assert_eq!(plan.overlays().len(), 1);

        let style = plan.overlays()[0].style();
        assert!(style.contains("left:10%"));
        assert!(style.contains("top:20%"));
        assert!(style.contains("width:30%"));
        assert!(style.contains("height:40%"));
        assert!(style.contains("transform:rotate(15deg)"));
        assert!(style.contains("transform-origin:center"));
        assert!(style.contains("backdrop-filter:blur(12px)"));
        assert!(style.contains("-webkit-backdrop-filter:blur(12px)"));
        assert!(style.contains("pointer-events:none"));
    }

    #[test]
    fn test_default_blur_amount() {
        let zones = vec![BlurZone::new(0.0, 0.0, 50.0, 50.0)];
        let plan = plan_overlays(ImageLoadState::Loaded, &zones);
        assert!(plan.overlays()[0].style().contains("blur(8px)"));
    }

    #[test]
    fn test_out_of_range_zones_clamped_or_dropped() {
        let zones = vec![
            BlurZone::new(90.0, 0.0, 20.0, 10.0),
            BlurZone::new(150.0, 0.0, 10.0, 10.0),
            BlurZone::new(f64::NAN, 0.0, 10.0, 10.0),
        ];
        let plan = plan_overlays(ImageLoadState::Loaded, &zones);
        assert_eq!(plan.overlays().len(), 1);
        assert_eq!(plan.overlays()[0].width, 10.0);
    }

    #[test]
    fn test_css_number() {
        assert_eq!(css_number(10.0), "10");
        assert_eq!(css_number(12.5), "12.5");
        assert_eq!(css_number(1.0 / 3.0), "0.3333");
        assert_eq!(css_number(-0.00001), "0");
        assert_eq!(css_number(f64::NAN), "0");
    }
}
