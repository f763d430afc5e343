//! 画像パス正規化モジュール
//!
//! 絶対URL・相対パス・blob/data URI・大文字混じりの "Before-"/"After-" などを
//! 1つの正規パスに揃える。正規パスはブラー領域マップの結合キーになる。
//!
//! ## 処理順
//! 1. 空文字 → 空文字
//! 2. blob: / data: → そのまま
//! 3. 絶対URL: ローカル開発ホストならパス部分のみ、外部ホストならそのまま
//! 4. クエリ・フラグメント除去
//! 5. 先頭の `/` を補う
//! 6. セグメント先頭の before-/after- を小文字化
//! 7. gallery-page 外の画像は車種トークンから `/images/gallery-page/<slug>/` に移す

use crate::directory::GalleryDirectoryTable;
use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

/// ギャラリー画像を示すパスセグメント
pub const GALLERY_PAGE_SEGMENT: &str = "/gallery-page/";

/// ローカル開発ホスト（この host のURLはパス部分だけを使う）
pub const DEFAULT_LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "::1"];

lazy_static::lazy_static! {
    static ref DEFAULT_NORMALIZER: PathNormalizer = PathNormalizer::default();
    // セグメント先頭の before-/after-（大文字小文字問わず）
    static ref PREFIX_RE: Regex = Regex::new(r"(?i)(^|/)(before|after)-").unwrap();
    static ref BEFORE_AFTER_NAME_RE: Regex = Regex::new(r"(?i)^(before|after)-").unwrap();
}

/// 正規化の警告（致命的ではない。呼び出し側がログに出す）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizationWarning {
    /// before-/after- 形式だが車種トークンが表にない
    UnmappedGalleryFilename { path: String },
    /// "://" を含むがURLとして解釈できない
    MalformedUrl { raw: String },
}

impl std::fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizationWarning::UnmappedGalleryFilename { path } => {
                write!(f, "no gallery directory mapping for {}", path)
            }
            NormalizationWarning::MalformedUrl { raw } => {
                write!(f, "could not parse image URL {}", raw)
            }
        }
    }
}

/// 正規化結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub path: String,
    pub warning: Option<NormalizationWarning>,
}

impl Normalized {
    fn clean(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            warning: None,
        }
    }
}

/// パス正規化器
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    local_hosts: Vec<String>,
    directories: GalleryDirectoryTable,
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new(GalleryDirectoryTable::builtin())
    }
}

impl PathNormalizer {
    pub fn new(directories: GalleryDirectoryTable) -> Self {
        Self {
            local_hosts: DEFAULT_LOCAL_HOSTS.iter().map(|h| h.to_string()).collect(),
            directories,
        }
    }

    /// ローカル開発ホストを差し替える
    pub fn with_local_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.local_hosts = hosts
            .into_iter()
            .map(|h| h.into().trim_matches(|c| c == '[' || c == ']').to_lowercase())
            .collect();
        self
    }

    pub fn directories(&self) -> &GalleryDirectoryTable {
        &self.directories
    }

    pub fn local_hosts(&self) -> &[String] {
        &self.local_hosts
    }

    pub fn is_local_host(&self, host: &str) -> bool {
        let host = host.trim_matches(|c| c == '[' || c == ']').to_lowercase();
        self.local_hosts.iter().any(|h| *h == host)
    }

    /// 正規パスを返す（失敗しない）
    pub fn normalize(&self, raw: &str) -> String {
        self.normalize_with_report(raw).path
    }

    /// 正規パスと警告を返す
    pub fn normalize_with_report(&self, raw: &str) -> Normalized {
        let raw = raw.trim();

        if raw.is_empty() {
            return Normalized::clean("");
        }

        if is_ephemeral(raw) {
            return Normalized::clean(raw);
        }

        let mut path = raw.to_string();

        match Url::parse(raw) {
            Ok(url) if url.has_host() => match url.host_str() {
                Some(host) if self.is_local_host(host) => {
                    // 相対パスと同じキーになるよう %XX を戻す
                    path = percent_decode_str(url.path()).decode_utf8_lossy().into_owned();
                }
                _ => return Normalized::clean(raw),
            },
            // スキームなし（相対パス）や "after-1:x" のような文字列はパスとして扱う
            Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {}
            Err(_) if raw.contains("://") => {
                return Normalized {
                    path: raw.to_string(),
                    warning: Some(NormalizationWarning::MalformedUrl { raw: raw.to_string() }),
                };
            }
            Err(_) => {}
        }

        if let Some(pos) = path.find(|c| c == '?' || c == '#') {
            path.truncate(pos);
        }

        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        let path = PREFIX_RE
            .replace_all(&path, |caps: &regex::Captures| {
                format!("{}{}-", &caps[1], caps[2].to_ascii_lowercase())
            })
            .into_owned();

        if path.contains(GALLERY_PAGE_SEGMENT) {
            return Normalized::clean(path);
        }

        let name = file_name(&path);
        if let Some(slug) = self.directories.slug_for(name) {
            return Normalized::clean(format!(
                "{}/{}/{}",
                crate::directory::GALLERY_PAGE_ROOT,
                slug,
                name
            ));
        }

        if is_before_after_name(name) {
            return Normalized {
                warning: Some(NormalizationWarning::UnmappedGalleryFilename { path: path.clone() }),
                path,
            };
        }

        Normalized::clean(path)
    }
}

/// 組み込み設定で正規化
pub fn normalize_image_path(raw: &str) -> String {
    DEFAULT_NORMALIZER.normalize(raw)
}

/// blob: / data: 参照（一時的なローカル参照なので書き換えない）
pub fn is_ephemeral(raw: &str) -> bool {
    has_prefix_ignore_case(raw, "blob:") || has_prefix_ignore_case(raw, "data:")
}

/// パスの最後のセグメント
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// before-/after- 命名規則のファイル名か
pub fn is_before_after_name(name: &str) -> bool {
    BEFORE_AFTER_NAME_RE.is_match(name)
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(raw: &str) -> String {
        normalize_image_path(raw)
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(n(""), "");
        assert_eq!(n("   "), "");
    }

    #[test]
    fn test_blob_and_data_unchanged() {
        let blob = "blob:http://localhost:3000/5f1c2a8e-1111-2222-3333-444455556666";
        assert_eq!(n(blob), blob);
        let data = "data:image/jpeg;base64,/9j/4AAQSkZJRg==";
        assert_eq!(n(data), data);
        assert_eq!(n("BLOB:abc?x=1"), "BLOB:abc?x=1");
    }

    #[test]
    fn test_localhost_url_reduced_to_path() {
        assert_eq!(
            n("https://localhost:3000/images/gallery-page/bmw-e90-repair/After-4-BmwE90-front.jpg?v=2#top"),
            "/images/gallery-page/bmw-e90-repair/after-4-BmwE90-front.jpg"
        );
        assert_eq!(n("http://127.0.0.1:8080/images/logo.png"), "/images/logo.png");
    }

    #[test]
    fn test_localhost_url_with_space_matches_bare_path() {
        let bare = "/images/gallery-page/x/after 1-front.jpg";
        assert_eq!(n("http://localhost:3000/images/gallery-page/x/after 1-front.jpg"), bare);
        assert_eq!(n("http://localhost:3000/images/gallery-page/x/after%201-front.jpg"), bare);
        assert_eq!(n(bare), bare);
    }

    #[test]
    fn test_localhost_url_with_non_ascii_matches_bare_path() {
        let bare = "/images/gallery-page/x/after-1-フロント.jpg";
        assert_eq!(n(&format!("http://localhost:3000{}", bare)), bare);
    }

    #[test]
    fn test_external_url_unchanged() {
        let url = "https://cdn.example.com/images/After-1-porsche.jpg?w=300";
        assert_eq!(n(url), url);
    }

    #[test]
    fn test_query_and_fragment_stripped() {
        assert_eq!(n("/images/logo.png?v=3"), "/images/logo.png");
        assert_eq!(n("/images/logo.png#hero"), "/images/logo.png");
    }

    #[test]
    fn test_leading_slash_added() {
        assert_eq!(n("images/gallery-page/x/after-1-y-front.jpg"), "/images/gallery-page/x/after-1-y-front.jpg");
    }

    #[test]
    fn test_prefix_case_normalized() {
        assert_eq!(
            n("/images/gallery-page/x/BEFORE-2-y.jpg"),
            "/images/gallery-page/x/before-2-y.jpg"
        );
        assert_eq!(
            n("/images/gallery-page/After-set/After-2-y.jpg"),
            "/images/gallery-page/after-set/after-2-y.jpg"
        );
        // 先頭以外の "after-" は触らない
        assert_eq!(
            n("/images/gallery-page/x/paint-After-2.jpg"),
            "/images/gallery-page/x/paint-After-2.jpg"
        );
    }

    #[test]
    fn test_relocates_known_model_into_gallery_page() {
        assert_eq!(
            n("/foo/bar/after-3-bluealfa-front.jpg"),
            "/images/gallery-page/blue-alfa-repair/after-3-bluealfa-front.jpg"
        );
        assert_eq!(
            n("After-1-GreenMercedes-side.jpg"),
            "/images/gallery-page/green-mercedes-repair/after-1-GreenMercedes-side.jpg"
        );
        assert_eq!(
            n("/uploads/thunderbird-engine.jpg"),
            "/images/gallery-page/thunderbird-restoration/thunderbird-engine.jpg"
        );
    }

    #[test]
    fn test_gallery_page_paths_not_relocated() {
        assert_eq!(
            n("/images/gallery-page/custom-dir/after-1-porsche.jpg"),
            "/images/gallery-page/custom-dir/after-1-porsche.jpg"
        );
    }

    #[test]
    fn test_unmapped_before_after_warns() {
        let normalizer = PathNormalizer::default();
        let result = normalizer.normalize_with_report("/uploads/after-9-unknowncar.jpg");
        assert_eq!(result.path, "/uploads/after-9-unknowncar.jpg");
        assert!(matches!(
            result.warning,
            Some(NormalizationWarning::UnmappedGalleryFilename { .. })
        ));

        let plain = normalizer.normalize_with_report("/images/logo.png");
        assert!(plain.warning.is_none());
    }

    #[test]
    fn test_malformed_url_warns_and_passes_through() {
        let normalizer = PathNormalizer::default();
        let result = normalizer.normalize_with_report("http://[bad");
        assert_eq!(result.path, "http://[bad");
        assert!(matches!(result.warning, Some(NormalizationWarning::MalformedUrl { .. })));
    }

    #[test]
    fn test_custom_local_hosts() {
        let normalizer = PathNormalizer::default().with_local_hosts(["dev.bodyshop.test"]);
        assert_eq!(
            normalizer.normalize("http://dev.bodyshop.test/images/logo.png"),
            "/images/logo.png"
        );
        let url = "http://localhost:3000/images/logo.png";
        assert_eq!(normalizer.normalize(url), url);
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "blob:http://localhost:3000/abc",
            "data:image/png;base64,AAAA",
            "https://localhost:3000/images/gallery-page/bmw-e90-repair/After-4-BmwE90-front.jpg",
            "https://cdn.example.com/x/After-1.jpg?q=1",
            "images/gallery-page/x/AFTER-1-y-front.jpg",
            "/foo/bar/after-3-bluealfa-front.jpg",
            "Before-2-Cadillac.JPG?cache=1",
            "/uploads/after-9-unknowncar.jpg",
            "http://[bad",
            "/",
            "?only-query",
            "http://localhost:3000/images/gallery-page/x/after%201-front.jpg",
            "/images/gallery-page/x/after 1-front.jpg",
        ];
        for raw in samples {
            let once = n(raw);
            assert_eq!(n(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_idempotent_across_forms() {
        let prefixes = [
            "",
            "/",
            "/images/",
            "images/gallery-page/blue-alfa-repair/",
            "http://localhost:3000/images/",
            "https://127.0.0.1/uploads/",
            "https://cdn.example.com/images/",
        ];
        let names = [
            "After-1-bluealfa-front.jpg",
            "BEFORE-2-BmwE90 side.JPG",
            "before-3-unknowncar.png",
            "after%202-%E3%83%95.jpg",
            "logo.png",
            "photo 100%.jpg",
        ];
        let suffixes = ["", "?v=1", "#frag", "?a=1#b"];

        for prefix in prefixes {
            for name in names {
                for suffix in suffixes {
                    let raw = format!("{}{}{}", prefix, name, suffix);
                    let once = n(&raw);
                    assert_eq!(n(&once), once, "not idempotent for {:?}", raw);
                }
            }
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/a/b/c.jpg"), "c.jpg");
        assert_eq!(file_name("c.jpg"), "c.jpg");
        assert_eq!(file_name("/a/"), "");
    }

    #[test]
    fn test_is_before_after_name() {
        assert!(is_before_after_name("After-1.jpg"));
        assert!(is_before_after_name("before-x.png"));
        assert!(!is_before_after_name("x-after-1.jpg"));
    }
}
