//! 画像パス正規化とブラー領域照合のテスト
//!
//! 正規化の冪等性、一時参照の素通し、表記揺れを吸収した照合を検証

use bodyshop_gallery::audit;
use bodyshop_gallery_common::{
    normalize_image_path, BlurMap, BlurZone, GalleryItem, MatchStrategy, PathNormalizer,
    SaveContext,
};

const SAMPLES: &[&str] = &[
    "",
    "   ",
    "/images/gallery-page/bmw-e90-repair/after-4-BmwE90-front.jpg",
    "http://localhost:3000/images/gallery-page/bmw-e90-repair/After-4-BmwE90-front.jpg",
    "https://cdn.example.com/uploads/after-1-jaguar.jpg",
    "http://127.0.0.1:8080/After-2-Porsche-rear.png?v=3#top",
    "http://[::1]/images/shop.jpg",
    "after-3-bluealfa-front.jpg",
    "Before-1-thunderbird.jpg",
    "/uploads/AFTER-9-unknown-car.jpg",
    "blob:http://localhost:3000/6f1c",
    "data:image/png;base64,iVBORw0KGgo=",
    "http://",
    "images/logo.png?x=1",
];

/// 正規化は冪等（2回かけても変わらない）
#[test]
fn test_normalize_idempotent() {
    let normalizer = PathNormalizer::default();
    for raw in SAMPLES {
        let once = normalizer.normalize(raw);
        let twice = normalizer.normalize(&once);
        assert_eq!(once, twice, "not idempotent for {:?}", raw);
    }
}

/// blob: / data: は書き換えない
#[test]
fn test_ephemeral_passthrough() {
    assert_eq!(
        normalize_image_path("blob:http://localhost:3000/6f1c"),
        "blob:http://localhost:3000/6f1c"
    );
    assert_eq!(
        normalize_image_path("data:image/png;base64,iVBORw0KGgo="),
        "data:image/png;base64,iVBORw0KGgo="
    );
}

/// 外部ホストのURLはそのまま
#[test]
fn test_remote_url_passthrough() {
    assert_eq!(
        normalize_image_path("https://cdn.example.com/uploads/after-1-jaguar.jpg"),
        "https://cdn.example.com/uploads/after-1-jaguar.jpg"
    );
}

/// ローカルホストのURL・大文字の接頭辞・クエリを吸収して照合できる
#[test]
fn test_host_stripped_case_insensitive_match() {
    let normalizer = PathNormalizer::default();
    let mut map = BlurMap::new();
    map.insert_raw(
        "/images/gallery-page/bmw-e90-repair/After-4-BmwE90-front.jpg",
        vec![BlurZone::new(10.0, 10.0, 20.0, 5.0)],
    );

    let resolution = map.resolve(
        &normalizer,
        "http://localhost:3000/images/gallery-page/bmw-e90-repair/after-4-BmwE90-front.jpg?cache=1",
    );
    assert_eq!(resolution.zones.len(), 1);
    assert!(!resolution.is_heuristic());
}

/// ディレクトリ表によりファイル名だけのパスもギャラリー内へ移される
#[test]
fn test_relocation_by_directory_table() {
    assert_eq!(
        normalize_image_path("after-3-bluealfa-front.jpg"),
        "/images/gallery-page/blue-alfa-repair/after-3-bluealfa-front.jpg"
    );
    assert_eq!(
        normalize_image_path("http://127.0.0.1:8080/After-2-Porsche-rear.png?v=3#top"),
        "/images/gallery-page/porsche-repair/after-2-Porsche-rear.png"
    );
}

/// 保存 → 別表記で照合 → 空保存で削除
#[test]
fn test_save_resolve_delete_cycle() {
    let normalizer = PathNormalizer::default();
    let mut map = BlurMap::new();
    let ctx = SaveContext::new("2026-03-01T09:00:00.000Z");

    let key = map
        .save(
            &normalizer,
            "http://localhost:3000/after-3-bluealfa-front.jpg",
            None,
            vec![BlurZone::new(1.0, 2.0, 3.0, 4.0)],
            &ctx,
        )
        .unwrap();
    assert_eq!(
        key.as_deref(),
        Some("/images/gallery-page/blue-alfa-repair/after-3-bluealfa-front.jpg")
    );

    let resolution = map.resolve(&normalizer, "AFTER-3-bluealfa-front.jpg");
    assert_eq!(resolution.strategy, Some(MatchStrategy::Exact));

    let removed = map
        .save(&normalizer, "after-3-bluealfa-front.jpg", resolution.matched_key.as_deref(), vec![], &ctx)
        .unwrap();
    assert!(removed.is_none());
    assert!(map.is_empty());
}

/// ファイル名だけの一致は推測一致として扱われ、監査で報告される
#[test]
fn test_file_name_fallback_reported() {
    let normalizer = PathNormalizer::default();
    let mut item = GalleryItem::new("Shop");
    item.main_image = "/images/shop/lobby.jpg".into();
    item.blur_areas
        .insert_raw("/legacy/uploads/lobby.jpg", vec![BlurZone::new(0.0, 0.0, 10.0, 10.0)]);

    let resolution = item.blur_areas.resolve(&normalizer, &item.main_image);
    assert_eq!(resolution.strategy, Some(MatchStrategy::FileName));
    assert!(resolution.is_heuristic());

    let report = audit::audit_item(&item, &normalizer);
    assert!(report
        .findings
        .iter()
        .any(|f| matches!(f, audit::Finding::HeuristicMatch { .. })));
}

/// ホスト・ディレクトリ・大文字小文字・エンコードの組み合わせでも冪等
#[test]
fn test_normalize_idempotent_generated() {
    let normalizer = PathNormalizer::default();
    let bases = [
        "",
        "/",
        "images/",
        "/images/gallery-page/bmw-e90-repair/",
        "http://localhost:3000/",
        "http://localhost:3000/images/gallery-page/x/",
        "https://127.0.0.1/uploads/",
        "http://[::1]:8080/images/",
        "https://cdn.example.com/images/",
    ];
    let prefixes = ["after-", "After-", "AFTER-", "before-", "BeFoRe-", ""];
    let stems = ["4-BmwE90-front", "1 thunderbird rear", "2%20jaguar", "3-ブルー", "logo"];
    let tails = [".jpg", ".JPG?v=1", ".png#top", ".webp?a=1#b"];

    for base in bases {
        for prefix in prefixes {
            for stem in stems {
                for tail in tails {
                    let raw = format!("{}{}{}{}", base, prefix, stem, tail);
                    let once = normalizer.normalize(&raw);
                    assert_eq!(normalizer.normalize(&once), once, "not idempotent for {:?}", raw);
                }
            }
        }
    }
}

/// 空白を含むファイル名は、URL表記（%20）と素のパスで同じキーになる
#[test]
fn test_space_in_file_name_matches_across_forms() {
    let normalizer = PathNormalizer::default();
    let bare = "/images/gallery-page/x/after 1-front.jpg";
    let encoded_url = "http://localhost:3000/images/gallery-page/x/after%201-front.jpg";
    assert_eq!(normalizer.normalize(encoded_url), normalizer.normalize(bare));

    // URL表記で保存し、素のパスで引く
    let mut map = BlurMap::new();
    let ctx = SaveContext::new("2026-01-01T00:00:00Z");
    let key = map
        .save(&normalizer, encoded_url, None, vec![BlurZone::new(10.0, 10.0, 5.0, 5.0)], &ctx)
        .unwrap();
    assert_eq!(key.as_deref(), Some(bare));

    let res = map.resolve(&normalizer, bare);
    assert_eq!(res.strategy, Some(MatchStrategy::Exact));
    assert_eq!(res.zones.len(), 1);

    // 素のパスで保存したものをURL表記で引く
    let mut map = BlurMap::new();
    map.insert_raw(bare, vec![BlurZone::new(1.0, 1.0, 1.0, 1.0)]);
    let res = map.resolve(&normalizer, "http://localhost:3000/images/gallery-page/x/after 1-front.jpg");
    assert_eq!(res.matched_key.as_deref(), Some(bare));
    assert_eq!(res.zones.len(), 1);
}

/// 移動先が不正なら移動は失敗し、元の矩形は残る
#[test]
fn test_failed_rename_keeps_zones() {
    let normalizer = PathNormalizer::default();
    let key = "/images/gallery-page/x/after-1-y.jpg";
    let mut map = BlurMap::new();
    map.insert_raw(key, vec![BlurZone::new(1.0, 1.0, 1.0, 1.0)]);
    let original = map.clone();

    let ctx = SaveContext::new("2026-01-01T00:00:00Z");
    assert!(map.rename_image(&normalizer, key, "   ", &ctx).is_err());
    assert_eq!(map, original);
}

/// 画像を外したら、その画像のブラー領域だけが消える
#[test]
fn test_removed_image_zones_are_dropped() {
    let normalizer = PathNormalizer::default();
    let mut previous = GalleryItem::new("x");
    previous.main_image = "/images/gallery-page/x/after-1-y.jpg".into();
    previous.before_images = vec!["http://localhost:3000/images/gallery-page/x/before%201-y.jpg".into()];
    previous
        .blur_areas
        .insert_raw("/images/gallery-page/x/before 1-y.jpg", vec![BlurZone::new(1.0, 1.0, 1.0, 1.0)]);
    previous
        .blur_areas
        .insert_raw("/images/gallery-page/x/after-1-y.jpg", vec![BlurZone::new(1.0, 1.0, 1.0, 1.0)]);

    let mut item = previous.clone();
    item.before_images.clear();
    assert_eq!(item.drop_removed_image_zones(&previous, &normalizer), 1);
    assert_eq!(
        item.blur_areas.keys().collect::<Vec<_>>(),
        vec!["/images/gallery-page/x/after-1-y.jpg"]
    );
}
