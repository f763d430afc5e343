//! ブラー領域エディタ
//!
//! 1枚の画像に対してブラー矩形を描画・移動・リサイズ・回転・削除する状態機械。
//!
//! ```text
//! Closed -> Open(image, zones) -> { Drawing, Adjusting, Idle } -> Closed
//! ```
//!
//! 編集中の矩形は画像実寸のピクセル座標で持つ。ポインタ入力は表示座標で受け取り、
//! 表示サイズ / 実寸 の比で変換する。保存時に実寸に対する%へ戻してブラー領域マップへ渡す。

use crate::blur_map::{BlurMap, Resolution, SaveContext};
use crate::error::{Error, Result};
use crate::geometry::{pixels_to_zone, zone_to_pixels, ImageSize, PixelRect, Point};
use crate::path::PathNormalizer;
use crate::types::{BlurZone, DEFAULT_BLUR_AMOUNT};

/// これより小さい描画は誤クリックとして捨てる（実寸px）
pub const MIN_ZONE_SIZE_PX: f64 = 4.0;

/// ハンドルの当たり判定半径（表示px）
pub const HANDLE_TOLERANCE_PX: f64 = 8.0;

/// 回転ハンドルの上辺からの距離（表示px）
pub const ROTATE_HANDLE_OFFSET_PX: f64 = 24.0;

/// リサイズハンドル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::NorthWest,
        Handle::North,
        Handle::NorthEast,
        Handle::East,
        Handle::SouthEast,
        Handle::South,
        Handle::SouthWest,
        Handle::West,
    ];

    /// 中心を原点としたときの単位位置（-1, 0, 1）
    fn unit(&self) -> (f64, f64) {
        match self {
            Handle::North => (0.0, -1.0),
            Handle::South => (0.0, 1.0),
            Handle::East => (1.0, 0.0),
            Handle::West => (-1.0, 0.0),
            Handle::NorthEast => (1.0, -1.0),
            Handle::NorthWest => (-1.0, -1.0),
            Handle::SouthEast => (1.0, 1.0),
            Handle::SouthWest => (-1.0, 1.0),
        }
    }

    /// CSSカーソル名
    pub fn cursor(&self) -> &'static str {
        match self {
            Handle::North | Handle::South => "ns-resize",
            Handle::East | Handle::West => "ew-resize",
            Handle::NorthEast | Handle::SouthWest => "nesw-resize",
            Handle::NorthWest | Handle::SouthEast => "nwse-resize",
        }
    }
}

/// 当たり判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Handle(usize, Handle),
    Rotate(usize),
    Body(usize),
}

/// 調整中の操作
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Move,
    Resize(Handle),
    Rotate,
}

/// セッション内のモード
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorMode {
    Idle,
    Drawing {
        origin: Point,
        current: Point,
    },
    Adjusting {
        index: usize,
        gesture: Gesture,
        start: Point,
        original: PixelRect,
    },
}

/// 外から見た状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Closed,
    Idle,
    Drawing,
    Adjusting,
}

/// 保存要求（ブラー領域マップへ渡す内容）
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    pub image_path: String,
    /// オープン時に照合したキー
    pub matched_key: Option<String>,
    pub zones: Vec<BlurZone>,
}

impl CommitRequest {
    /// ブラー領域マップへ保存し、書き込んだキーを返す
    pub fn apply(
        &self,
        map: &mut BlurMap,
        normalizer: &PathNormalizer,
        ctx: &SaveContext,
    ) -> Result<Option<String>> {
        map.save(
            normalizer,
            &self.image_path,
            self.matched_key.as_deref(),
            self.zones.clone(),
            ctx,
        )
    }
}

/// 1枚の画像の編集セッション
#[derive(Debug, Clone)]
pub struct EditorSession {
    image_path: String,
    matched_key: Option<String>,
    natural: Option<ImageSize>,
    rendered: ImageSize,
    zones: Vec<PixelRect>,
    /// 実寸が分かる前に渡された%の矩形
    pending: Vec<BlurZone>,
    mode: EditorMode,
    selected: Option<usize>,
    default_blur_amount: f64,
    dirty: bool,
}

impl EditorSession {
    pub fn new(
        image_path: impl Into<String>,
        resolution: Resolution,
        natural: Option<ImageSize>,
        rendered: ImageSize,
    ) -> Self {
        let mut session = Self {
            image_path: image_path.into(),
            matched_key: resolution.matched_key,
            natural: None,
            rendered,
            zones: Vec::new(),
            pending: resolution.zones,
            mode: EditorMode::Idle,
            selected: None,
            default_blur_amount: DEFAULT_BLUR_AMOUNT,
            dirty: false,
        };
        if let Some(natural) = natural {
            session.image_loaded(natural, rendered);
        }
        session
    }

    pub fn with_default_blur_amount(mut self, amount: f64) -> Self {
        if amount.is_finite() && amount >= 0.0 {
            self.default_blur_amount = amount;
        }
        self
    }

    pub fn image_path(&self) -> &str {
        &self.image_path
    }

    pub fn matched_key(&self) -> Option<&str> {
        self.matched_key.as_deref()
    }

    pub fn natural_size(&self) -> Option<ImageSize> {
        self.natural
    }

    pub fn rendered_size(&self) -> ImageSize {
        self.rendered
    }

    /// 編集中の矩形（実寸px）
    pub fn zones(&self) -> &[PixelRect] {
        &self.zones
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_loaded(&self) -> bool {
        self.natural.is_some()
    }

    /// 画像の読込完了。保留中の%矩形をピクセルに展開する
    pub fn image_loaded(&mut self, natural: ImageSize, rendered: ImageSize) {
        if !natural.is_valid() {
            return;
        }
        self.natural = Some(natural);
        self.rendered = rendered;
        let pending = std::mem::take(&mut self.pending);
        self.zones
            .extend(pending.iter().map(|zone| zone_to_pixels(zone, natural)));
    }

    /// 表示サイズの変更（ウィンドウリサイズ等）
    pub fn set_rendered_size(&mut self, rendered: ImageSize) {
        self.rendered = rendered;
    }

    /// 表示座標 → 実寸px のスケール
    fn scale(&self) -> Option<(f64, f64)> {
        let natural = self.natural?;
        if !self.rendered.is_valid() {
            return None;
        }
        Some((
            natural.width / self.rendered.width,
            natural.height / self.rendered.height,
        ))
    }

    /// 表示座標 → 実寸座標
    pub fn screen_to_image(&self, p: Point) -> Option<Point> {
        let (sx, sy) = self.scale()?;
        Some(Point::new(p.x * sx, p.y * sy))
    }

    /// 実寸の矩形 → 表示座標の矩形
    pub fn to_screen(&self, rect: &PixelRect) -> Option<PixelRect> {
        let (sx, sy) = self.scale()?;
        Some(rect.scaled(1.0 / sx, 1.0 / sy))
    }

    /// 表示中の全矩形（表示座標）
    pub fn screen_zones(&self) -> Vec<PixelRect> {
        self.zones
            .iter()
            .filter_map(|z| self.to_screen(z))
            .collect()
    }

    /// 描画中のプレビュー（実寸px）
    pub fn drawing_preview(&self) -> Option<PixelRect> {
        match self.mode {
            EditorMode::Drawing { origin, current } => Some(PixelRect::from_corners(origin, current)),
            _ => None,
        }
    }

    /// 表示座標での当たり判定（手前＝後に追加した矩形を優先）
    pub fn hit_test(&self, p: Point) -> Option<Hit> {
        for (index, zone) in self.zones.iter().enumerate().rev() {
            let Some(rect) = self.to_screen(zone) else {
                continue;
            };

            let rotate_handle = rect.local_to_world(Point::new(
                0.0,
                -rect.height / 2.0 - ROTATE_HANDLE_OFFSET_PX,
            ));
            if rotate_handle.distance(p) <= HANDLE_TOLERANCE_PX {
                return Some(Hit::Rotate(index));
            }

            for handle in Handle::ALL {
                let (ux, uy) = handle.unit();
                let pos = rect.local_to_world(Point::new(ux * rect.width / 2.0, uy * rect.height / 2.0));
                if pos.distance(p) <= HANDLE_TOLERANCE_PX {
                    return Some(Hit::Handle(index, handle));
                }
            }

            if rect.contains(p) {
                return Some(Hit::Body(index));
            }
        }
        None
    }

    /// ポインタ押下。当たり判定に応じて描画・移動・リサイズ・回転を始める
    ///
    /// 画像が未読込なら何もしない（false）。
    pub fn pointer_down(&mut self, p: Point) -> bool {
        if !self.is_loaded() {
            return false;
        }
        let result = match self.hit_test(p) {
            Some(Hit::Handle(index, handle)) => self.begin_resize(index, handle, p),
            Some(Hit::Rotate(index)) => self.begin_rotate(index, p),
            Some(Hit::Body(index)) => self.begin_move(index, p),
            None => self.begin_draw(p),
        };
        result.is_ok()
    }

    pub fn begin_draw(&mut self, p: Point) -> Result<()> {
        let origin = self.require_point(p)?;
        self.selected = None;
        self.mode = EditorMode::Drawing {
            origin,
            current: origin,
        };
        Ok(())
    }

    pub fn begin_move(&mut self, index: usize, p: Point) -> Result<()> {
        self.begin_adjust(index, Gesture::Move, p)
    }

    pub fn begin_resize(&mut self, index: usize, handle: Handle, p: Point) -> Result<()> {
        self.begin_adjust(index, Gesture::Resize(handle), p)
    }

    pub fn begin_rotate(&mut self, index: usize, p: Point) -> Result<()> {
        self.begin_adjust(index, Gesture::Rotate, p)
    }

    fn begin_adjust(&mut self, index: usize, gesture: Gesture, p: Point) -> Result<()> {
        let start = self.require_point(p)?;
        let original = *self.zones.get(index).ok_or(Error::InvalidZoneIndex(index))?;
        self.selected = Some(index);
        self.mode = EditorMode::Adjusting {
            index,
            gesture,
            start,
            original,
        };
        Ok(())
    }

    fn require_point(&self, p: Point) -> Result<Point> {
        self.screen_to_image(p).ok_or_else(|| {
            Error::GeometryConversion("image natural dimensions are not available yet".to_string())
        })
    }

    /// ポインタ移動
    pub fn pointer_move(&mut self, p: Point) {
        let (Some(point), Some(bounds)) = (self.screen_to_image(p), self.natural) else {
            return;
        };

        match self.mode {
            EditorMode::Idle => {}
            EditorMode::Drawing { origin, .. } => {
                self.mode = EditorMode::Drawing {
                    origin,
                    current: Point::new(point.x.clamp(0.0, bounds.width), point.y.clamp(0.0, bounds.height)),
                };
            }
            EditorMode::Adjusting {
                index,
                gesture,
                start,
                original,
            } => {
                let updated = match gesture {
                    Gesture::Move => moved(&original, start, point, bounds),
                    Gesture::Resize(handle) => resized(&original, handle, start, point, bounds),
                    Gesture::Rotate => rotated(&original, start, point),
                };
                if let Some(zone) = self.zones.get_mut(index) {
                    *zone = updated;
                    self.dirty = true;
                }
            }
        }
    }

    /// ポインタ解放。確定した矩形のインデックスを返す
    pub fn pointer_up(&mut self, p: Point) -> Option<usize> {
        self.pointer_move(p);
        let mode = std::mem::replace(&mut self.mode, EditorMode::Idle);
        match mode {
            EditorMode::Idle => None,
            EditorMode::Drawing { origin, current } => {
                let mut rect = PixelRect::from_corners(origin, current);
                if rect.width < MIN_ZONE_SIZE_PX || rect.height < MIN_ZONE_SIZE_PX {
                    return None;
                }
                rect.blur_amount = self.default_blur_amount;
                self.zones.push(rect);
                self.dirty = true;
                let index = self.zones.len() - 1;
                self.selected = Some(index);
                Some(index)
            }
            EditorMode::Adjusting { index, .. } => Some(index),
        }
    }

    /// 操作を取り消して押下前の状態へ戻す
    pub fn cancel_gesture(&mut self) {
        if let EditorMode::Adjusting { index, original, .. } = self.mode {
            if let Some(zone) = self.zones.get_mut(index) {
                *zone = original;
            }
        }
        self.mode = EditorMode::Idle;
    }

    pub fn select(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index {
            if i >= self.zones.len() {
                return Err(Error::InvalidZoneIndex(i));
            }
        }
        self.selected = index;
        Ok(())
    }

    pub fn remove_zone(&mut self, index: usize) -> Result<PixelRect> {
        if index >= self.zones.len() {
            return Err(Error::InvalidZoneIndex(index));
        }
        let removed = self.zones.remove(index);
        self.mode = EditorMode::Idle;
        self.selected = match self.selected {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        self.dirty = true;
        Ok(removed)
    }

    pub fn set_blur_amount(&mut self, index: usize, amount: f64) -> Result<()> {
        let zone = self.zones.get_mut(index).ok_or(Error::InvalidZoneIndex(index))?;
        if amount.is_finite() && amount >= 0.0 {
            zone.blur_amount = amount;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn set_rotation(&mut self, index: usize, degrees: f64) -> Result<()> {
        let zone = self.zones.get_mut(index).ok_or(Error::InvalidZoneIndex(index))?;
        if degrees.is_finite() {
            zone.rotation = normalize_degrees(degrees);
            self.dirty = true;
        }
        Ok(())
    }

    /// 全矩形を削除
    pub fn clear(&mut self) {
        if !self.zones.is_empty() || !self.pending.is_empty() {
            self.dirty = true;
        }
        self.zones.clear();
        self.pending.clear();
        self.mode = EditorMode::Idle;
        self.selected = None;
    }

    /// 実寸pxを%へ変換して保存要求を作る
    ///
    /// 実寸が不明なら GeometryConversion エラー（保存してはならない）。
    pub fn commit(&self) -> Result<CommitRequest> {
        if self.natural.is_none() {
            return Err(Error::GeometryConversion(
                "image natural dimensions are not available yet".to_string(),
            ));
        }
        let zones = self
            .zones
            .iter()
            .map(|rect| pixels_to_zone(rect, self.natural))
            .collect::<Result<Vec<_>>>()?;

        Ok(CommitRequest {
            image_path: self.image_path.clone(),
            matched_key: self.matched_key.clone(),
            zones,
        })
    }
}

/// エディタ本体（開閉と保存中フラグを管理）
#[derive(Debug, Clone)]
pub struct BlurEditor {
    session: Option<EditorSession>,
    saving: bool,
    default_blur_amount: f64,
}

impl Default for BlurEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl BlurEditor {
    pub fn new() -> Self {
        Self {
            session: None,
            saving: false,
            default_blur_amount: DEFAULT_BLUR_AMOUNT,
        }
    }

    pub fn with_default_blur_amount(mut self, amount: f64) -> Self {
        self.default_blur_amount = amount;
        self
    }

    /// 画像を開く（開いていたセッションは破棄）
    pub fn open(
        &mut self,
        image_path: impl Into<String>,
        resolution: Resolution,
        natural: Option<ImageSize>,
        rendered: ImageSize,
    ) -> Result<&mut EditorSession> {
        if self.saving {
            return Err(Error::SaveInProgress);
        }
        let session = EditorSession::new(image_path, resolution, natural, rendered)
            .with_default_blur_amount(self.default_blur_amount);
        Ok(self.session.insert(session))
    }

    /// 保存せずに閉じる。未保存の変更があったら true
    pub fn close(&mut self) -> bool {
        self.session.take().map_or(false, |s| s.is_dirty())
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn session(&self) -> Option<&EditorSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut EditorSession> {
        self.session.as_mut()
    }

    pub fn state(&self) -> EditorState {
        match self.session.as_ref().map(|s| s.mode()) {
            None => EditorState::Closed,
            Some(EditorMode::Idle) => EditorState::Idle,
            Some(EditorMode::Drawing { .. }) => EditorState::Drawing,
            Some(EditorMode::Adjusting { .. }) => EditorState::Adjusting,
        }
    }

    /// 保存開始。保存中の二重実行は SaveInProgress
    pub fn begin_save(&mut self) -> Result<CommitRequest> {
        if self.saving {
            return Err(Error::SaveInProgress);
        }
        let session = self.session.as_ref().ok_or(Error::EditorClosed)?;
        let request = session.commit()?;
        self.saving = true;
        Ok(request)
    }

    /// 保存完了。成功したら閉じ、失敗したら編集内容を残す
    pub fn finish_save(&mut self, success: bool) {
        self.saving = false;
        if success {
            self.session = None;
        }
    }
}

fn moved(original: &PixelRect, start: Point, p: Point, bounds: ImageSize) -> PixelRect {
    let mut rect = *original;
    rect.x += p.x - start.x;
    rect.y += p.y - start.y;
    rect.shifted_into(bounds)
}

fn resized(original: &PixelRect, handle: Handle, start: Point, p: Point, bounds: ImageSize) -> PixelRect {
    // 移動量を矩形のローカル軸へ
    let delta = Point::new(p.x - start.x, p.y - start.y).rotated(-original.rotation);
    let (ux, uy) = handle.unit();

    let (mut left, mut right) = (-original.width / 2.0, original.width / 2.0);
    let (mut top, mut bottom) = (-original.height / 2.0, original.height / 2.0);

    if ux > 0.0 {
        right = (right + delta.x).max(left + MIN_ZONE_SIZE_PX);
    } else if ux < 0.0 {
        left = (left + delta.x).min(right - MIN_ZONE_SIZE_PX);
    }
    if uy > 0.0 {
        bottom = (bottom + delta.y).max(top + MIN_ZONE_SIZE_PX);
    } else if uy < 0.0 {
        top = (top + delta.y).min(bottom - MIN_ZONE_SIZE_PX);
    }

    let width = right - left;
    let height = bottom - top;
    let center = original.local_to_world(Point::new((left + right) / 2.0, (top + bottom) / 2.0));

    let mut rect = *original;
    rect.x = center.x - width / 2.0;
    rect.y = center.y - height / 2.0;
    rect.width = width;
    rect.height = height;

    let cropped = rect.cropped_to(bounds);
    if cropped.width < MIN_ZONE_SIZE_PX || cropped.height < MIN_ZONE_SIZE_PX {
        *original
    } else {
        cropped
    }
}

fn rotated(original: &PixelRect, start: Point, p: Point) -> PixelRect {
    let c = original.center();
    let a0 = (start.y - c.y).atan2(start.x - c.x);
    let a1 = (p.y - c.y).atan2(p.x - c.x);
    let mut rect = *original;
    rect.rotation = normalize_degrees(original.rotation + (a1 - a0).to_degrees());
    rect
}

/// 角度を [0, 360) に揃える
fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    if (d - 360.0).abs() < 1e-9 {
        0.0
    } else {
        d
    }
}
