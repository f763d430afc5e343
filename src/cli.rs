use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gallery-admin")]
#[command(about = "板金塗装ギャラリー管理ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// APIの代わりにJSONファイルのストアを使う
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// ギャラリー項目の一覧
    List {
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// ギャラリー項目の詳細
    Show {
        #[arg(required = true)]
        id: String,
    },

    /// ギャラリー項目を作成
    Create {
        #[arg(short, long, required = true)]
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// カテゴリ（カンマ区切り）
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,

        /// タグ（カンマ区切り）
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// メイン画像パス
        #[arg(long)]
        main_image: Option<String>,

        /// ビフォー画像パス（カンマ区切り）
        #[arg(long, value_delimiter = ',')]
        before: Vec<String>,

        /// アフター画像パス（カンマ区切り）
        #[arg(long, value_delimiter = ',')]
        after: Vec<String>,
    },

    /// ギャラリー項目を部分更新
    Update {
        #[arg(required = true)]
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long, value_delimiter = ',')]
        categories: Option<Vec<String>>,

        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        #[arg(long)]
        main_image: Option<String>,

        #[arg(long, value_delimiter = ',')]
        before: Option<Vec<String>>,

        #[arg(long, value_delimiter = ',')]
        after: Option<Vec<String>>,
    },

    /// ギャラリー項目を削除
    Delete {
        #[arg(required = true)]
        id: String,

        /// 確認なしで削除
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// 画像パスを正規化して表示
    Normalize {
        /// 画像パス・URL（複数可）
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// 画像パスに対応するブラー領域を表示
    Resolve {
        #[arg(required = true)]
        id: String,

        #[arg(required = true)]
        image: String,
    },

    /// ブラー領域の編集
    Zones {
        #[command(subcommand)]
        action: ZonesAction,
    },

    /// ブラー領域マップの監査
    Audit {
        /// 対象ID（省略時は全件）
        id: Option<String>,

        /// 問題を修復して保存
        #[arg(long)]
        fix: bool,

        /// 修復内容を表示するだけ（保存しない）
        #[arg(long)]
        dry_run: bool,
    },

    /// ブラー領域を画像ファイルへ焼き込む
    Redact {
        #[arg(required = true)]
        id: String,

        /// サイトの公開ディレクトリ（画像パスの起点）
        #[arg(short, long, required = true)]
        root: PathBuf,

        /// 出力フォルダ
        #[arg(short, long, required = true)]
        output: PathBuf,

        /// ぼかしの強さ（blurAmount に掛ける倍率）
        #[arg(long, default_value = "1.0")]
        strength: f32,

        /// キャッシュを使わず再生成
        #[arg(long)]
        force: bool,
    },

    /// ローカルフォルダの画像にギャラリー内の配置先を提案
    Suggest {
        #[arg(required = true)]
        folder: PathBuf,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,
    },

    /// 設定を表示/編集
    Config {
        /// APIのベースURLを設定
        #[arg(long)]
        set_api_url: Option<String>,

        /// APIトークンを設定
        #[arg(long)]
        set_api_token: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum ZonesAction {
    /// ブラー矩形を追加（%指定）
    Add {
        #[arg(required = true)]
        id: String,

        #[arg(required = true)]
        image: String,

        /// x,y,width,height（画像サイズに対する%）
        #[arg(long, required = true)]
        rect: ZoneRect,

        /// 回転（度）
        #[arg(long, default_value = "0")]
        rotation: f64,

        /// ぼかし量（px、省略時は設定値）
        #[arg(long)]
        blur: Option<f64>,
    },

    /// 画像のブラー矩形をすべて削除
    Clear {
        #[arg(required = true)]
        id: String,

        #[arg(required = true)]
        image: String,
    },
}

/// `x,y,width,height` 形式の矩形
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoneRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl std::str::FromStr for ZoneRect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<f64> = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("Invalid rect {}: {}", s, e))?;

        match values.as_slice() {
            [x, y, width, height] if *width > 0.0 && *height > 0.0 => Ok(ZoneRect {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            }),
            [_, _, _, _] => Err(format!("Invalid rect {}: width and height must be positive", s)),
            _ => Err(format!("Invalid rect {}: use x,y,width,height", s)),
        }
    }
}
