use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "book-discovery")]
#[command(about = "書籍検索・おすすめクライアント", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 書籍を検索して1ページ分を表示
    Search {
        /// 検索クエリ
        #[arg(required = true)]
        query: String,

        /// 表示するページ番号
        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// 入力候補を表示
    Suggest {
        /// 入力途中の文字列
        #[arg(required = true)]
        prefix: String,
    },

    /// 検索結果から書籍の詳細を表示
    Show {
        /// 書籍を探す検索クエリ
        #[arg(required = true)]
        query: String,

        /// 書籍ID
        #[arg(required = true)]
        book_id: String,
    },

    /// お気に入りを切り替え
    Favorite {
        /// 書籍を探す検索クエリ
        #[arg(required = true)]
        query: String,

        /// 書籍ID
        #[arg(required = true)]
        book_id: String,
    },

    /// おすすめ理由を表示
    Explain {
        /// 書籍を探す検索クエリ
        #[arg(required = true)]
        query: String,

        /// 書籍ID
        #[arg(required = true)]
        book_id: String,
    },

    /// ログイン
    Login {
        /// ユーザー名またはメールアドレス
        #[arg(short, long)]
        identifier: Option<String>,
    },

    /// ユーザー登録
    Register {
        #[arg(short, long)]
        username: Option<String>,

        #[arg(short, long)]
        email: Option<String>,
    },

    /// ログアウト
    Logout,

    /// ログイン中のユーザーを表示
    Whoami,

    /// お気に入り一覧
    Favorites,

    /// AIに書籍を相談
    Chat {
        /// 最初のメッセージ（省略時は対話モード）
        message: Option<String>,
    },

    /// 管理者操作
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// 設定を表示/編集
    Config {
        /// APIのURLを設定
        #[arg(long)]
        set_api_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// 管理者としてログイン
    Login {
        /// 管理者のユーザー名またはメールアドレス
        #[arg(short, long)]
        identifier: Option<String>,
    },

    /// 管理者ログアウト
    Logout,

    /// 利用状況の概要
    Overview,

    /// ユーザー検索
    Users {
        #[arg(default_value = "")]
        query: String,
    },

    /// 書籍検索
    Books {
        #[arg(default_value = "")]
        query: String,
    },

    /// ユーザー削除
    DeleteUser {
        #[arg(required = true)]
        user_id: i64,

        /// 確認を省略
        #[arg(short, long)]
        yes: bool,
    },

    /// 書籍削除
    DeleteBook {
        #[arg(required = true)]
        book_id: String,

        /// 確認を省略
        #[arg(short, long)]
        yes: bool,
    },

    /// AIトークン使用量
    TokenUsage,
}
