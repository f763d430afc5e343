//! 座標変換
//!
//! ブラー領域は保存時は画像実寸に対する%、編集中は実寸ピクセルで持つ。
//! 画面上の表示サイズとの変換もここで行う。

use crate::error::{Error, Result};
use crate::types::BlurZone;
use serde::{Deserialize, Serialize};

/// 画像サイズ(px)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: f64,
    pub height: f64,
}

impl ImageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// 幅・高さとも有限かつ正
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 原点回りに回転（度、画面座標系なので時計回りが正）
    pub fn rotated(self, degrees: f64) -> Point {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Point::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn distance(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// ピクセル単位の矩形（編集中のブラー領域）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub blur_amount: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: 0.0,
            blur_amount: crate::types::DEFAULT_BLUR_AMOUNT,
        }
    }

    /// 2点から矩形を作る（逆方向のドラッグも可）
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (a.x - b.x).abs(),
            (a.y - b.y).abs(),
        )
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// 矩形のローカル座標（中心原点・回転前）を画像座標に変換
    pub fn local_to_world(&self, local: Point) -> Point {
        let r = local.rotated(self.rotation);
        let c = self.center();
        Point::new(c.x + r.x, c.y + r.y)
    }

    /// 画像座標を矩形のローカル座標（中心原点・回転前）に変換
    pub fn world_to_local(&self, world: Point) -> Point {
        let c = self.center();
        Point::new(world.x - c.x, world.y - c.y).rotated(-self.rotation)
    }

    /// 回転を考慮した内外判定
    pub fn contains(&self, p: Point) -> bool {
        let local = self.world_to_local(p);
        local.x.abs() <= self.width / 2.0 && local.y.abs() <= self.height / 2.0
    }

    /// 回転後の外接矩形 (min_x, min_y, max_x, max_y)
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        let corners = [
            Point::new(-hw, -hh),
            Point::new(hw, -hh),
            Point::new(hw, hh),
            Point::new(-hw, hh),
        ]
        .map(|p| self.local_to_world(p));

        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        )
    }

    /// サイズを保ったまま画像内に押し込む（移動用）
    pub fn shifted_into(&self, bounds: ImageSize) -> PixelRect {
        let mut rect = *self;
        rect.width = rect.width.min(bounds.width);
        rect.height = rect.height.min(bounds.height);
        rect.x = rect.x.clamp(0.0, bounds.width - rect.width);
        rect.y = rect.y.clamp(0.0, bounds.height - rect.height);
        rect
    }

    /// 画像外の部分を切り落とす（描画・リサイズ用）
    pub fn cropped_to(&self, bounds: ImageSize) -> PixelRect {
        let mut rect = *self;
        let left = self.x.clamp(0.0, bounds.width);
        let top = self.y.clamp(0.0, bounds.height);
        let right = (self.x + self.width).clamp(0.0, bounds.width);
        let bottom = (self.y + self.height).clamp(0.0, bounds.height);
        rect.x = left;
        rect.y = top;
        rect.width = right - left;
        rect.height = bottom - top;
        rect
    }

    /// 一様スケール（実寸 ↔ 表示サイズ）
    pub fn scaled(&self, sx: f64, sy: f64) -> PixelRect {
        PixelRect {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
            rotation: self.rotation,
            blur_amount: self.blur_amount,
        }
    }
}

/// %の矩形 → ピクセル矩形
///
/// rotation と blur_amount は距離ではないのでそのまま引き継ぐ。
pub fn zone_to_pixels(zone: &BlurZone, size: ImageSize) -> PixelRect {
    PixelRect {
        x: zone.x * size.width / 100.0,
        y: zone.y * size.height / 100.0,
        width: zone.width * size.width / 100.0,
        height: zone.height * size.height / 100.0,
        rotation: zone.rotation,
        blur_amount: zone.blur_amount,
    }
}

/// ピクセル矩形 → %の矩形（percentage = pixel / natural * 100）
///
/// 実寸が不明（画像未読込）なら GeometryConversion エラー。
pub fn pixels_to_zone(rect: &PixelRect, natural: Option<ImageSize>) -> Result<BlurZone> {
    let natural = natural.ok_or_else(|| {
        Error::GeometryConversion("image natural dimensions are not available yet".to_string())
    })?;
    if !natural.is_valid() {
        return Err(Error::GeometryConversion(format!(
            "invalid natural dimensions {}x{}",
            natural.width, natural.height
        )));
    }

    Ok(BlurZone::new(
        rect.x * 100.0 / natural.width,
        rect.y * 100.0 / natural.height,
        rect.width * 100.0 / natural.width,
        rect.height * 100.0 / natural.height,
    )
    .with_rotation(rect.rotation)
    .with_blur_amount(rect.blur_amount))
}
