//! ブラー領域の焼き込み
//!
//! 保存済みのブラー領域を画像ファイルへガウスぼかしとして書き込む。
//! 回転した矩形は矩形内のピクセルだけを置き換える。
//! 元画像と領域のハッシュをキャッシュし、変更がなければ再生成しない。

use crate::error::{GalleryError, Result};
use bodyshop_gallery_common::geometry::zone_to_pixels;
use bodyshop_gallery_common::{BlurZone, GalleryItem, ImageSize, PathNormalizer, Point};
use image::{imageops, DynamicImage, RgbaImage};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CACHE_FILE_NAME: &str = ".redact-cache.json";

/// 1枚分の処理
#[derive(Debug, Clone)]
pub struct RedactJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub zones: Vec<BlurZone>,
}

/// バッチ処理の結果
#[derive(Debug, Default)]
pub struct RedactSummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: Vec<(PathBuf, String)>,
}

/// ぼかしの強さ（blurAmount px に掛ける倍率）
#[derive(Debug, Clone, Copy)]
pub struct RedactOptions {
    pub strength: f32,
    pub use_cache: bool,
}

impl Default for RedactOptions {
    fn default() -> Self {
        Self {
            strength: 1.0,
            use_cache: true,
        }
    }
}

/// 画像にブラー領域を焼き込む
pub fn redact_image(img: &DynamicImage, zones: &[BlurZone], strength: f32) -> RgbaImage {
    let mut out = img.to_rgba8();
    let (width, height) = out.dimensions();
    if width == 0 || height == 0 {
        return out;
    }
    let size = ImageSize::new(width as f64, height as f64);

    for zone in zones.iter().filter_map(BlurZone::clamped) {
        let rect = zone_to_pixels(&zone, size);
        let sigma = (zone.blur_amount as f32 * strength).max(0.5);
        let margin = (sigma * 3.0).ceil() as f64;

        let (x0, y0, x1, y1) = rect.bounding_box();
        let left = (x0 - margin).floor().max(0.0) as u32;
        let top = (y0 - margin).floor().max(0.0) as u32;
        let right = ((x1 + margin).ceil() as u32).min(width);
        let bottom = ((y1 + margin).ceil() as u32).min(height);
        if right <= left || bottom <= top {
            continue;
        }

        let patch = imageops::crop_imm(&out, left, top, right - left, bottom - top).to_image();
        let blurred = imageops::blur(&patch, sigma);

        let fill_left = x0.floor().max(0.0) as u32;
        let fill_top = y0.floor().max(0.0) as u32;
        let fill_right = (x1.ceil() as u32).min(width);
        let fill_bottom = (y1.ceil() as u32).min(height);

        for y in fill_top..fill_bottom {
            for x in fill_left..fill_right {
                let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if rect.contains(center) {
                    out.put_pixel(x, y, *blurred.get_pixel(x - left, y - top));
                }
            }
        }
    }

    out
}

/// 1ファイル処理
/// 項目の画像から処理対象を作る
///
/// 同じ正規パスの画像は1回だけ処理する（メイン画像がアフターにも載っている場合など）。
/// 出力先は正規パスのディレクトリ構成をそのまま `output` 下に再現する。
/// サイト外のURLや blob/data 参照は対象外。
pub fn plan_jobs(item: &GalleryItem, normalizer: &PathNormalizer, root: &Path, output: &Path) -> Vec<RedactJob> {
    let mut seen = BTreeSet::new();
    let mut jobs = Vec::new();
    for (_, image) in item.image_paths() {
        let relative = normalizer.normalize(image);
        if !relative.starts_with('/') || !seen.insert(relative.clone()) {
            continue;
        }
        let resolution = item.blur_areas.resolve(normalizer, image);
        if resolution.zones.is_empty() {
            continue;
        }
        let relative = relative.trim_start_matches('/');
        jobs.push(RedactJob {
            source: root.join(relative),
            output: output.join(relative),
            zones: resolution.zones,
        });
    }
    jobs
}

pub fn redact_file(job: &RedactJob, strength: f32) -> Result<()> {
    if !job.source.exists() {
        return Err(GalleryError::FileNotFound(job.source.display().to_string()));
    }
    let img = image::open(&job.source)
        .map_err(|e| GalleryError::ImageLoad(format!("{}: {}", job.source.display(), e)))?;

    let redacted = DynamicImage::ImageRgba8(redact_image(&img, &job.zones, strength));

    if let Some(parent) = job.output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // JPEGはアルファを持てない
    let is_jpeg = job
        .output
        .extension()
        .map(|e| matches!(e.to_string_lossy().to_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);
    let to_save = if is_jpeg {
        DynamicImage::ImageRgb8(redacted.to_rgb8())
    } else {
        redacted
    };

    to_save
        .save(&job.output)
        .map_err(|e| GalleryError::ImageLoad(format!("{}: {}", job.output.display(), e)))?;
    Ok(())
}

/// 複数ファイルを並列処理
pub fn redact_batch(jobs: &[RedactJob], cache_dir: &Path, options: RedactOptions) -> Result<RedactSummary> {
    let mut cache = if options.use_cache {
        RedactCache::load(cache_dir)
    } else {
        RedactCache::default()
    };

    let mut summary = RedactSummary::default();
    let mut pending = Vec::new();

    for job in jobs {
        let hash = match compute_job_hash(job, options.strength) {
            Ok(h) => h,
            Err(e) => {
                summary.failed.push((job.source.clone(), e.to_string()));
                continue;
            }
        };
        if options.use_cache && job.output.exists() && cache.is_fresh(&job.output, &hash) {
            debug!(output = %job.output.display(), "redaction up to date");
            summary.skipped += 1;
            continue;
        }
        pending.push((job, hash));
    }

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let results: Vec<(&RedactJob, String, Result<()>)> = pending
        .into_par_iter()
        .map(|(job, hash)| {
            let result = redact_file(job, options.strength);
            pb.inc(1);
            (job, hash, result)
        })
        .collect();
    pb.finish_and_clear();

    for (job, hash, result) in results {
        match result {
            Ok(()) => {
                cache.insert(&job.output, hash);
                summary.written += 1;
            }
            Err(e) => {
                warn!(source = %job.source.display(), error = %e, "redaction failed");
                summary.failed.push((job.source.clone(), e.to_string()));
            }
        }
    }

    if options.use_cache {
        cache.save(cache_dir)?;
    }

    Ok(summary)
}

/// 元画像・領域・強さのハッシュ（SHA-256）
pub fn compute_job_hash(job: &RedactJob, strength: f32) -> Result<String> {
    let bytes = std::fs::read(&job.source)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hasher.update(serde_json::to_vec(&job.zones)?);
    hasher.update(strength.to_le_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// 焼き込み結果のキャッシュ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactCache {
    version: u32,
    /// 出力ファイル名 → 入力ハッシュ
    entries: HashMap<String, String>,
}

impl Default for RedactCache {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

impl RedactCache {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// 読み込み（壊れている・バージョン違いなら空）
    pub fn load(folder: &Path) -> Self {
        let file = match File::open(Self::cache_path(folder)) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        match serde_json::from_reader::<_, RedactCache>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                warn!("redaction cache version mismatch, rebuilding");
                Self::default()
            }
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        std::fs::create_dir_all(folder)?;
        let file = File::create(Self::cache_path(folder))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn is_fresh(&self, output: &Path, hash: &str) -> bool {
        self.entries.get(&cache_key(output)).map_or(false, |h| h == hash)
    }

    pub fn insert(&mut self, output: &Path, hash: String) {
        self.entries.insert(cache_key(output), hash);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// キャッシュ削除（存在しなければ false）
    pub fn clear(folder: &Path) -> Result<bool> {
        let path = Self::cache_path(folder);
        if path.exists() {
            std::fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

fn cache_key(output: &Path) -> String {
    output.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// 左半分黒・右半分白の画像
    fn split_image(width: u32, height: u32) -> DynamicImage {
        let img = RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_redact_blurs_inside_zone_only() {
        let img = split_image(100, 100);
        // 境界をまたぐ中央の矩形
        let zones = vec![BlurZone::new(40.0, 40.0, 20.0, 20.0).with_blur_amount(4.0)];
        let out = redact_image(&img, &zones, 1.0);

        // 境界付近は中間色になる
        let edge = out.get_pixel(49, 50)[0];
        assert!(edge > 0 && edge < 255, "edge={}", edge);

        // 矩形外は変わらない
        assert_eq!(out.get_pixel(49, 10)[0], 0);
        assert_eq!(out.get_pixel(50, 10)[0], 255);
    }

    #[test]
    fn test_redact_respects_rotation() {
        let img = split_image(100, 100);
        // 細長い横長矩形を90度回転 → 縦長になる
        let zones = vec![BlurZone::new(20.0, 48.0, 60.0, 4.0)
            .with_rotation(90.0)
            .with_blur_amount(4.0)];
        let out = redact_image(&img, &zones, 1.0);

        // 回転前なら含まれていた左端は変わらない
        assert_eq!(out.get_pixel(22, 50)[0], 0);
        // 回転後の縦長領域の境界付近はぼける
        let edge = out.get_pixel(49, 30)[0];
        assert!(edge > 0 && edge < 255, "edge={}", edge);
    }

    #[test]
    fn test_redact_file_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.png");
        split_image(40, 40).save(&source).unwrap();

        let job = RedactJob {
            source,
            output: dir.path().join("out").join("redacted.jpg"),
            zones: vec![BlurZone::new(25.0, 25.0, 50.0, 50.0)],
        };
        redact_file(&job, 1.0).unwrap();
        assert!(job.output.exists());
    }

    #[test]
    fn test_missing_source() {
        let job = RedactJob {
            source: PathBuf::from("/nonexistent/in.png"),
            output: PathBuf::from("/tmp/out.png"),
            zones: vec![],
        };
        assert!(matches!(redact_file(&job, 1.0), Err(GalleryError::FileNotFound(_))));
    }

    #[test]
    fn test_batch_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.png");
        split_image(40, 40).save(&source).unwrap();
        let out_dir = dir.path().join("out");

        let jobs = vec![RedactJob {
            source,
            output: out_dir.join("in.png"),
            zones: vec![BlurZone::new(25.0, 25.0, 50.0, 50.0)],
        }];

        let first = redact_batch(&jobs, &out_dir, RedactOptions::default()).unwrap();
        assert_eq!(first.written, 1);
        let second = redact_batch(&jobs, &out_dir, RedactOptions::default()).unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.skipped, 1);

        // 領域が変われば再生成
        let mut changed = jobs.clone();
        changed[0].zones[0].blur_amount = 12.0;
        let third = redact_batch(&changed, &out_dir, RedactOptions::default()).unwrap();
        assert_eq!(third.written, 1);

        assert!(RedactCache::clear(&out_dir).unwrap());
        assert!(!RedactCache::clear(&out_dir).unwrap());
    }

    #[test]
    fn test_plan_jobs_dedupes_and_keeps_directories() {
        let normalizer = PathNormalizer::default();
        let main = "/images/gallery-page/a-car/after-1-front.jpg";
        let mut item = GalleryItem::new("x");
        item.main_image = main.into();
        item.after_images = vec![main.into(), "/images/gallery-page/b-car/after-1-front.jpg".into()];
        item.before_images = vec!["https://cdn.example.com/before-1-front.jpg".into()];
        item.blur_areas.insert_raw(main, vec![BlurZone::new(1.0, 1.0, 5.0, 5.0)]);
        item.blur_areas.insert_raw(
            "/images/gallery-page/b-car/after-1-front.jpg",
            vec![BlurZone::new(1.0, 1.0, 5.0, 5.0)],
        );

        let jobs = plan_jobs(&item, &normalizer, Path::new("/site/public"), Path::new("/out"));
        let outputs: Vec<_> = jobs.iter().map(|j| j.output.clone()).collect();
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("/out/images/gallery-page/a-car/after-1-front.jpg"),
                PathBuf::from("/out/images/gallery-page/b-car/after-1-front.jpg"),
            ]
        );
        assert_eq!(jobs[0].source, PathBuf::from("/site/public/images/gallery-page/a-car/after-1-front.jpg"));
    }
}
