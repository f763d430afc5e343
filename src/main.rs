use bodyshop_gallery::gallery::{FileGalleryClient, GalleryClient, GalleryService, HttpGalleryClient};
use bodyshop_gallery::{audit, cli, config, error, redact, scanner};
use bodyshop_gallery_common::{BlurZone, GalleryItem, GalleryItemPatch};
use clap::Parser;
use cli::{Cli, Commands, ZonesAction};
use config::Config;
use dialoguer::Confirm;
use error::{GalleryError, Result};
use std::collections::BTreeSet;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load()?;

    match cli.command {
        Commands::Normalize { paths } => {
            let normalizer = config.normalizer()?;
            for raw in &paths {
                let normalized = normalizer.normalize_with_report(raw);
                println!("{}\n  → {}", raw, normalized.path);
                if let Some(warning) = normalized.warning {
                    warn!("{}", warning);
                    println!("  ⚠ {}", warning);
                }
            }
        }

        Commands::Suggest { folder, recursive } => {
            println!("🔍 gallery-admin - 配置先の提案\n");

            let images = scanner::scan_folder(&folder, recursive)?;
            println!("✔ {}枚の画像を検出\n", images.len());

            let table = config.directory_table()?;
            let mut unmapped = 0;
            for s in scanner::suggest_paths(&images, &table) {
                match s.gallery_path {
                    Some(path) => println!("  {} → {}", s.file_name, path),
                    None if s.before_after => {
                        unmapped += 1;
                        println!("  {} → (ディレクトリ表にありません)", s.file_name);
                    }
                    None => println!("  {} → (ギャラリー画像名ではありません)", s.file_name),
                }
            }
            if unmapped > 0 {
                println!("\n⚠ {}件はディレクトリ表への追加が必要です", unmapped);
            }
        }

        Commands::Config { set_api_url, set_api_token, show } => {
            let mut config = config;

            if let Some(url) = set_api_url {
                config.set_api_url(url)?;
                println!("✔ APIのURLを設定しました");
            }

            if let Some(token) = set_api_token {
                config.set_api_token(token)?;
                println!("✔ APIトークンを設定しました");
            }

            if show {
                println!("設定:");
                println!("  設定ファイル: {}", Config::config_path()?.display());
                println!("  API URL: {}", config.api_base_url());
                println!("  APIトークン: {}", if config.api_token().is_some() { "設定済み" } else { "未設定" });
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  ローカルホスト: {}", config.local_hosts.join(", "));
                println!("  既定のぼかし量: {}px", config.default_blur_amount);
                println!(
                    "  ディレクトリ表: {}",
                    config
                        .directory_table
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "組み込み".into())
                );
            }
        }

        command => {
            let normalizer = config.normalizer()?;
            match &cli.store {
                Some(store) => {
                    debug!(store = %store.display(), "using file store");
                    let service = GalleryService::new(FileGalleryClient::open(store)?, normalizer);
                    run_gallery_command(&service, command, &config).await?;
                }
                None => {
                    let client = HttpGalleryClient::from_config(&config)?;
                    debug!(endpoint = client.endpoint(), "using gallery api");
                    let service = GalleryService::new(client, normalizer);
                    run_gallery_command(&service, command, &config).await?;
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_gallery_command<C: GalleryClient>(
    service: &GalleryService<C>,
    command: Commands,
    config: &Config,
) -> Result<()> {
    match command {
        Commands::List { json } => {
            let items = service.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                println!("📋 {}件\n", items.len());
                for item in &items {
                    println!(
                        "  {}  {}  (画像 {}枚, ブラー {}件)",
                        item.id,
                        item.title,
                        item.image_paths().len(),
                        item.blur_areas.total_zones()
                    );
                }
            }
        }

        Commands::Show { id } => {
            let item = service.get(&id).await?;
            println!("{}", serde_json::to_string_pretty(&item)?);
        }

        Commands::Create { title, description, categories, tags, main_image, before, after } => {
            let mut item = GalleryItem::new(title);
            item.description = description;
            item.categories = categories.into_iter().collect();
            item.tags = tags;
            item.main_image = main_image.unwrap_or_default();
            item.before_images = before;
            item.after_images = after;

            warn_unmapped(service, &item);
            let created = service.create(item).await?;
            println!("✔ 作成しました: {}", created.id);
        }

        Commands::Update { id, title, description, categories, tags, main_image, before, after } => {
            let patch = GalleryItemPatch {
                title,
                description,
                categories: categories.map(|c| c.into_iter().collect::<BTreeSet<_>>()),
                tags,
                main_image,
                before_images: before,
                after_images: after,
                blur_areas: None,
            };
            if patch.is_empty() {
                println!("変更する項目がありません");
                return Ok(());
            }

            let updated = service.update(&id, patch).await?;
            warn_unmapped(service, &updated);
            println!("✔ 更新しました: {}", updated.id);
        }

        Commands::Delete { id, yes } => {
            let item = service.get(&id).await?;
            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!("「{}」({}) を削除しますか？", item.title, item.id))
                    .default(false)
                    .interact()
                    .map_err(|dialoguer::Error::IO(e)| e)?;

            if confirmed {
                service.delete(&id).await?;
                println!("✔ 削除しました: {}", id);
            } else {
                println!("中止しました");
            }
        }

        Commands::Resolve { id, image } => {
            let resolution = service.resolve_zones(&id, &image).await?;
            match (&resolution.matched_key, resolution.strategy) {
                (Some(key), Some(strategy)) => {
                    println!("キー: {} ({})", key, strategy.as_str());
                    if resolution.is_heuristic() {
                        println!("⚠ ファイル名のみで一致しました");
                    }
                    println!("{}", serde_json::to_string_pretty(&resolution.zones)?);
                }
                _ => println!("ブラー領域はありません"),
            }
        }

        Commands::Zones { action } => match action {
            ZonesAction::Add { id, image, rect, rotation, blur } => {
                let mut zones = service.resolve_zones(&id, &image).await?.zones;
                zones.push(
                    BlurZone::new(rect.x, rect.y, rect.width, rect.height)
                        .with_rotation(rotation)
                        .with_blur_amount(blur.unwrap_or(config.default_blur_amount)),
                );
                let count = zones.len();
                match service.save_zones(&id, &image, zones).await? {
                    Some(key) => println!("✔ 保存しました: {} ({}件)", key, count),
                    None => println!("範囲内の矩形がないため保存しませんでした"),
                }
            }
            ZonesAction::Clear { id, image } => {
                service.save_zones(&id, &image, Vec::new()).await?;
                println!("✔ ブラー領域を削除しました");
            }
        },

        Commands::Audit { id, fix, dry_run } => {
            println!("🔎 gallery-admin - ブラー領域の監査\n");

            let items = match id {
                Some(id) => vec![service.get(&id).await?],
                None => service.list().await?,
            };

            let mut problems = 0;
            for item in items {
                let report = audit::audit_item(&item, service.normalizer());
                if report.is_clean() {
                    continue;
                }
                problems += report.findings.len();
                println!("[{}] {}", report.item_id, report.title);
                for finding in &report.findings {
                    println!("  - {}", finding);
                }

                if fix || dry_run {
                    let mut repaired = item.clone();
                    let stats = audit::repair_item(
                        &mut repaired,
                        service.normalizer(),
                        &bodyshop_gallery::gallery::now_timestamp(),
                    );
                    println!(
                        "  → 移動 {} / 削除 {} / クランプ {}",
                        stats.moved_keys, stats.removed_keys, stats.clamped_zones
                    );
                    if fix && !dry_run && !stats.is_empty() {
                        service.replace(repaired).await?;
                        println!("  ✔ 保存しました");
                    }
                }
            }

            if problems == 0 {
                println!("✅ 問題は見つかりませんでした");
            } else {
                println!("\n⚠ {}件の問題", problems);
            }
        }

        Commands::Redact { id, root, output, strength, force } => {
            println!("🖼  gallery-admin - ブラー焼き込み\n");

            if !root.exists() {
                return Err(GalleryError::FolderNotFound(root.display().to_string()));
            }

            let item = service.get(&id).await?;
            let jobs = redact::plan_jobs(&item, service.normalizer(), &root, &output);

            if jobs.is_empty() {
                println!("ブラー領域のある画像がありません");
                return Ok(());
            }

            println!("[1/1] {}枚を処理中...", jobs.len());
            let options = redact::RedactOptions {
                strength,
                use_cache: !force,
            };
            let summary = redact::redact_batch(&jobs, &output, options)?;
            println!("✔ 書き出し {} / スキップ {}", summary.written, summary.skipped);
            for (path, err) in &summary.failed {
                println!("✗ {}: {}", path.display(), err);
            }

            println!("\n✅ 完了");
        }

        Commands::Normalize { .. } | Commands::Suggest { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

/// ディレクトリ表にないギャラリー画像名を警告
fn warn_unmapped<C: GalleryClient>(service: &GalleryService<C>, item: &GalleryItem) {
    for (_, image) in item.image_paths() {
        if let Some(warning) = service.normalizer().normalize_with_report(image).warning {
            warn!("{}", warning);
        }
    }
}
