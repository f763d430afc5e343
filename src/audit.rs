//! ブラー領域マップの監査・修復
//!
//! ギャラリー項目の blurAreas を画像パスと突き合わせて問題を洗い出す。
//!
//! ## 検出する問題
//! 1. 同じ正規形になる重複キー
//! 2. 正規形でないキー
//! 3. どの画像にも対応しないキー（blob:/data: の一時キーを含む）
//! 4. [0,100] からはみ出した矩形
//! 5. ファイル名だけで一致した画像（推測一致）
//! 6. ディレクトリ表にないギャラリー画像名

use bodyshop_gallery_common::path::is_ephemeral;
use bodyshop_gallery_common::{
    BlurMap, GalleryItem, MatchStrategy, NormalizationWarning, PathNormalizer, SaveContext,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

/// 検出した問題
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    DuplicateKeys { canonical: String, keys: Vec<String> },
    NonCanonicalKey { key: String, canonical: String },
    OrphanedKey { key: String },
    EphemeralKey { key: String },
    OutOfRangeZone { key: String, index: usize },
    HeuristicMatch {
        image: String,
        key: String,
        strategy: MatchStrategy,
        ambiguous: bool,
    },
    UnmappedImage { warning: NormalizationWarning },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::DuplicateKeys { canonical, keys } => {
                write!(f, "重複キー ({}件) → {}: {}", keys.len(), canonical, keys.join(", "))
            }
            Finding::NonCanonicalKey { key, canonical } => {
                write!(f, "正規形でないキー: {} → {}", key, canonical)
            }
            Finding::OrphanedKey { key } => write!(f, "対応する画像がないキー: {}", key),
            Finding::EphemeralKey { key } => write!(f, "一時参照のキー: {}", key),
            Finding::OutOfRangeZone { key, index } => {
                write!(f, "範囲外の矩形: {} [{}]", key, index)
            }
            Finding::HeuristicMatch { image, key, strategy, ambiguous } => write!(
                f,
                "推測一致 ({}{}): {} → {}",
                strategy.as_str(),
                if *ambiguous { ", 複数候補" } else { "" },
                image,
                key
            ),
            Finding::UnmappedImage { warning } => write!(f, "{}", warning),
        }
    }
}

/// 1項目の監査結果
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub item_id: String,
    pub title: String,
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// 修復の統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairStats {
    /// 正規キーへ移したキー数
    pub moved_keys: usize,
    /// 削除したキー数
    pub removed_keys: usize,
    /// 切り詰め・削除した矩形数
    pub clamped_zones: usize,
}

impl RepairStats {
    pub fn is_empty(&self) -> bool {
        *self == RepairStats::default()
    }
}

/// 画像ごとの照合結果
struct Claim<'a> {
    image: &'a str,
    key: String,
    strategy: MatchStrategy,
    ambiguous: bool,
}

fn claims<'a>(item: &'a GalleryItem, normalizer: &PathNormalizer) -> Vec<Claim<'a>> {
    item.image_paths()
        .into_iter()
        .filter_map(|(_, image)| {
            let resolution = item.blur_areas.resolve(normalizer, image);
            Some(Claim {
                image,
                key: resolution.matched_key?,
                strategy: resolution.strategy?,
                ambiguous: resolution.ambiguous,
            })
        })
        .collect()
}

/// ギャラリー項目を監査
pub fn audit_item(item: &GalleryItem, normalizer: &PathNormalizer) -> AuditReport {
    let mut findings = Vec::new();
    let map = &item.blur_areas;

    for (_, image) in item.image_paths() {
        if let Some(warning) = normalizer.normalize_with_report(image).warning {
            findings.push(Finding::UnmappedImage { warning });
        }
    }

    for keys in map.duplicate_groups(normalizer) {
        findings.push(Finding::DuplicateKeys {
            canonical: normalizer.normalize(&keys[0]),
            keys,
        });
    }

    let claims = claims(item, normalizer);
    let claimed: BTreeSet<&str> = claims.iter().map(|c| c.key.as_str()).collect();

    for claim in &claims {
        if claim.strategy == MatchStrategy::FileName {
            findings.push(Finding::HeuristicMatch {
                image: claim.image.to_string(),
                key: claim.key.clone(),
                strategy: claim.strategy,
                ambiguous: claim.ambiguous,
            });
        }
    }

    for (key, zones) in map.iter() {
        if is_ephemeral(key) {
            findings.push(Finding::EphemeralKey { key: key.clone() });
        } else {
            let canonical = normalizer.normalize(key);
            if &canonical != key {
                findings.push(Finding::NonCanonicalKey {
                    key: key.clone(),
                    canonical,
                });
            }
            let duplicate_claimed = claims
                .iter()
                .any(|c| normalizer.normalize(&c.key) == normalizer.normalize(key));
            if !claimed.contains(key.as_str()) && !duplicate_claimed {
                findings.push(Finding::OrphanedKey { key: key.clone() });
            }
        }

        for (index, zone) in zones.iter().enumerate() {
            if !zone.is_within_bounds() {
                findings.push(Finding::OutOfRangeZone {
                    key: key.clone(),
                    index,
                });
            }
        }
    }

    AuditReport {
        item_id: item.id.clone(),
        title: item.title.clone(),
        findings,
    }
}

/// ギャラリー項目のブラー領域を修復
///
/// - 画像に対応するキーは画像の正規パスへ移す（重複は統合、矩形はクランプ）
/// - 複数の画像から推測一致したキーは触らない
/// - どの画像にも対応しないキーは削除
pub fn repair_item(item: &mut GalleryItem, normalizer: &PathNormalizer, saved_at: &str) -> RepairStats {
    let mut stats = RepairStats::default();

    let claims: Vec<(String, String, MatchStrategy, bool)> = claims(item, normalizer)
        .into_iter()
        .map(|c| (c.image.to_string(), c.key, c.strategy, c.ambiguous))
        .collect();

    let mut claim_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, key, _, _) in &claims {
        *claim_counts.entry(key.as_str()).or_default() += 1;
    }

    let mut skipped: Vec<String> = Vec::new();
    let mut map: BlurMap = item.blur_areas.clone();

    for (image, key, strategy, ambiguous) in &claims {
        let shared = claim_counts.get(key.as_str()).copied().unwrap_or(0) > 1;
        if *strategy == MatchStrategy::FileName && (*ambiguous || shared) {
            skipped.push(key.clone());
            continue;
        }

        let canonical = normalizer.normalize(image);
        let needs_work = *key != canonical
            || map.duplicate_groups(normalizer).iter().any(|g| g.contains(key))
            || map
                .get(key)
                .map_or(false, |zones| zones.iter().any(|z| !z.is_within_bounds()));
        if !needs_work {
            continue;
        }

        let Some(zones) = map.get(key).cloned() else {
            continue;
        };

        // 移動に失敗したら元のキーを残す
        let mut next = map.clone();
        next.remove_raw(key);
        let ctx = SaveContext::new(saved_at).with_role(item.role_of(normalizer, image));
        match next.save(normalizer, image, None, zones.clone(), &ctx) {
            Ok(new_key) => {
                if new_key.as_deref().map_or(false, |k| k != key.as_str()) {
                    stats.moved_keys += 1;
                }
                stats.clamped_zones += zones.iter().filter(|z| !z.is_within_bounds()).count();
                stats.removed_keys += map.len().saturating_sub(next.len());
                map = next;
            }
            Err(e) => {
                warn!(image = %image, error = %e, "blur zones could not be moved");
                skipped.push(key.clone());
            }
        }
    }

    let keep: Vec<&str> = item
        .image_paths()
        .into_iter()
        .map(|(_, p)| p)
        .chain(skipped.iter().map(|k| k.as_str()))
        .collect();
    stats.removed_keys += map.retain_images(normalizer, keep).len();

    item.blur_areas = map;
    stats
}
