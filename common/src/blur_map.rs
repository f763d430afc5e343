//! ブラー領域マップ
//!
//! 正規パス → ブラー矩形リストの対応表。ギャラリーアイテムの `blurAreas` として永続化される。
//!
//! ## 照合の優先順位
//! 1. 正規化した入力パスでの完全一致
//! 2. キーを正規化した索引での一致（`/images/` の有無の揺れも試す）
//! 3. ファイル名のみの一致（大文字小文字無視、先頭のキーを採用）
//!
//! 3 は同じファイル名を別アイテムが使い回すと誤一致しうる。
//! `Resolution::is_heuristic` で呼び出し側が判別できるようにしている。

use crate::error::{Error, Result};
use crate::path::{file_name, is_ephemeral, PathNormalizer};
use crate::types::{BlurZone, ImageRole, ZoneProvenance};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

const IMAGES_PREFIX: &str = "/images/";

/// どの規則で一致したか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    Normalized,
    ImagesPrefixVariant,
    FileName,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::Normalized => "normalized",
            MatchStrategy::ImagesPrefixVariant => "images-prefix",
            MatchStrategy::FileName => "file-name",
        }
    }
}

/// 照合結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub zones: Vec<BlurZone>,
    /// 一致したキー（保存時に同じキーへ書き戻す）
    pub matched_key: Option<String>,
    pub strategy: Option<MatchStrategy>,
    /// ファイル名一致で候補が複数あった
    pub ambiguous: bool,
}

impl Resolution {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn is_match(&self) -> bool {
        self.matched_key.is_some()
    }

    /// ファイル名のみでの一致（誤一致の可能性あり）
    pub fn is_heuristic(&self) -> bool {
        self.strategy == Some(MatchStrategy::FileName)
    }
}

/// 保存時のスタンプ情報
#[derive(Debug, Clone, PartialEq)]
pub struct SaveContext {
    /// RFC 3339 のタイムスタンプ
    pub saved_at: String,
    pub image_role: Option<ImageRole>,
}

impl SaveContext {
    pub fn new(saved_at: impl Into<String>) -> Self {
        Self {
            saved_at: saved_at.into(),
            image_role: None,
        }
    }

    pub fn with_role(mut self, role: Option<ImageRole>) -> Self {
        self.image_role = role;
        self
    }
}

/// 正規パス → ブラー矩形リスト
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlurMap(BTreeMap<String, Vec<BlurZone>>);

impl BlurMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Vec<BlurZone>> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<BlurZone>)> {
        self.0.iter()
    }

    /// 照合・正規化なしでそのまま書き込む（読み込み済みデータの復元用）
    pub fn insert_raw(&mut self, key: impl Into<String>, zones: Vec<BlurZone>) {
        self.0.insert(key.into(), zones);
    }

    pub fn remove_raw(&mut self, key: &str) -> Option<Vec<BlurZone>> {
        self.0.remove(key)
    }

    /// 全キーの矩形数合計
    pub fn total_zones(&self) -> usize {
        self.0.values().map(|z| z.len()).sum()
    }

    /// 画像パスに対応するブラー矩形を探す
    pub fn resolve(&self, normalizer: &PathNormalizer, raw: &str) -> Resolution {
        match self.find_key(normalizer, raw, true) {
            Some((key, strategy, ambiguous)) => Resolution {
                zones: self.0.get(&key).cloned().unwrap_or_default(),
                matched_key: Some(key),
                strategy: Some(strategy),
                ambiguous,
            },
            None => Resolution::not_found(),
        }
    }

    /// ブラー矩形を保存する
    ///
    /// - 照合済みのキーがあればそのキーへ、なければ正規化した入力パスへ書く
    /// - 同じ正規形になる他のキーは削除（重複エントリの掃除）
    /// - 空のリストはキーごと削除
    /// - 各矩形は [0,100] にクランプし、保存時刻と出所情報を付与
    ///
    /// 書き込んだキーを返す（削除した場合は None）。
    pub fn save(
        &mut self,
        normalizer: &PathNormalizer,
        raw: &str,
        matched_key: Option<&str>,
        zones: Vec<BlurZone>,
        ctx: &SaveContext,
    ) -> Result<Option<String>> {
        let normalized_source = normalizer.normalize(raw);
        let key = match matched_key {
            Some(k) if !k.trim().is_empty() => k.to_string(),
            _ if normalized_source.is_empty() => return Err(Error::EmptyImagePath),
            _ => normalized_source.clone(),
        };
        let canonical = normalizer.normalize(&key);

        let stamped: Vec<BlurZone> = zones
            .iter()
            .filter_map(BlurZone::clamped)
            .map(|mut zone| {
                zone.saved_at = Some(ctx.saved_at.clone());
                zone.provenance = Some(ZoneProvenance {
                    source_path: raw.to_string(),
                    normalized_path: normalized_source.clone(),
                    image_role: ctx.image_role,
                });
                zone
            })
            .collect();

        self.0
            .retain(|k, _| k == &key || normalizer.normalize(k) != canonical);

        if stamped.is_empty() {
            self.0.remove(&key);
            Ok(None)
        } else {
            self.0.insert(key.clone(), stamped);
            Ok(Some(key))
        }
    }

    /// 画像削除に伴いブラー矩形を消す（ファイル名のみの一致は使わない）
    ///
    /// 削除したキーの数を返す。
    pub fn remove_image(&mut self, normalizer: &PathNormalizer, raw: &str) -> usize {
        let Some((key, _, _)) = self.find_key(normalizer, raw, false) else {
            return 0;
        };
        let canonical = normalizer.normalize(&key);
        let before = self.0.len();
        self.0.retain(|k, _| normalizer.normalize(k) != canonical);
        before - self.0.len()
    }

    /// 指定した画像のいずれにも対応しないキーを削除し、削除したキーを返す
    pub fn retain_images<'a, I>(&mut self, normalizer: &PathNormalizer, paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keep: BTreeSet<String> = paths
            .into_iter()
            .filter_map(|p| self.find_key(normalizer, p, false))
            .map(|(key, _, _)| normalizer.normalize(&key))
            .collect();

        let removed: Vec<String> = self
            .0
            .keys()
            .filter(|k| !keep.contains(&normalizer.normalize(k)))
            .cloned()
            .collect();
        for key in &removed {
            self.0.remove(key);
        }
        removed
    }

    /// 画像の移動・改名に合わせてブラー矩形を新しいパスへ移す
    ///
    /// 移動したら true。
    pub fn rename_image(
        &mut self,
        normalizer: &PathNormalizer,
        old_raw: &str,
        new_raw: &str,
        ctx: &SaveContext,
    ) -> Result<bool> {
        let Some((key, _, _)) = self.find_key(normalizer, old_raw, false) else {
            return Ok(false);
        };
        let zones = self.0.get(&key).cloned().unwrap_or_default();
        // 保存に失敗したら元のマップを残す
        let mut moved = self.clone();
        moved.remove_image(normalizer, old_raw);
        moved.save(normalizer, new_raw, None, zones, ctx)?;
        *self = moved;
        Ok(true)
    }

    /// 正規形が同じになるキーのグループ（2件以上のもの）
    pub fn duplicate_groups(&self, normalizer: &PathNormalizer) -> Vec<Vec<String>> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for key in self.0.keys() {
            groups
                .entry(normalizer.normalize(key))
                .or_default()
                .push(key.clone());
        }
        groups.into_values().filter(|g| g.len() > 1).collect()
    }

    fn find_key(
        &self,
        normalizer: &PathNormalizer,
        raw: &str,
        allow_file_name: bool,
    ) -> Option<(String, MatchStrategy, bool)> {
        let target = normalizer.normalize(raw);
        if target.is_empty() || self.0.is_empty() {
            return None;
        }

        if self.0.contains_key(&target) {
            return Some((target, MatchStrategy::Exact, false));
        }

        // 正規化キー → 元のキー（BTreeMap順で最初のキーを採用）
        let mut lookup: HashMap<String, &String> = HashMap::new();
        for key in self.0.keys() {
            lookup.entry(normalizer.normalize(key)).or_insert(key);
        }

        if let Some(key) = lookup.get(&target) {
            return Some(((*key).clone(), MatchStrategy::Normalized, false));
        }

        let variant = match target.strip_prefix(IMAGES_PREFIX) {
            Some(rest) => format!("/{}", rest),
            None => format!("/images{}", target),
        };
        if let Some(key) = lookup.get(&variant) {
            return Some(((*key).clone(), MatchStrategy::ImagesPrefixVariant, false));
        }

        if !allow_file_name || is_ephemeral(&target) {
            return None;
        }

        let name = file_name(&target).to_lowercase();
        if name.is_empty() {
            return None;
        }
        let mut candidates = self
            .0
            .keys()
            .filter(|k| file_name(k).to_lowercase() == name);
        let first = candidates.next()?;
        let ambiguous = candidates.next().is_some();
        Some((first.clone(), MatchStrategy::FileName, ambiguous))
    }
}

impl From<BTreeMap<String, Vec<BlurZone>>> for BlurMap {
    fn from(map: BTreeMap<String, Vec<BlurZone>>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Vec<BlurZone>)> for BlurMap {
    fn from_iter<T: IntoIterator<Item = (String, Vec<BlurZone>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
