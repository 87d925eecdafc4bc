//! # オブジェクトストレージ
//!
//! 署名付きアップロードURLを発行するストレージプロバイダの抽象インターフェース。
//! Supabase Storage実装は `supabase`、S3互換実装は `s3` サブモジュールを参照。

pub mod supabase;

#[cfg(feature = "vendor-aws")]
pub mod s3;

pub use self::supabase::SupabaseStorage;

#[cfg(feature = "vendor-aws")]
pub use self::s3::S3Storage;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

use crate::error::GatewayError;

/// 公開URLでエスケープしない文字集合（JavaScriptの `encodeURI` と同じ）。
pub(crate) const PUBLIC_URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// 署名付きアップロードURL生成結果。
#[derive(Debug, Clone)]
pub struct SignedUpload {
    /// クライアントがアップロードに使用するURL（PUT）
    pub signed_url: String,
}

/// オブジェクトストレージの抽象インターフェース。
///
/// バケットは実装側で固定される。Gatewayはキーと有効期限だけを渡す。
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    /// バケット名（ログ出力用）
    fn bucket(&self) -> &str;

    /// 指定キーへの時間制限付き署名付きアップロードURLを生成する。
    ///
    /// プロバイダのエラーは `GatewayError::Storage` にメッセージをそのまま載せて返す。
    async fn create_signed_upload_url(
        &self,
        object_key: &str,
        expiry_secs: u32,
    ) -> Result<SignedUpload, GatewayError>;

    /// 指定キーの公開URLを解決する。
    ///
    /// 公開URLを持たない構成では `Ok(None)` を返す。
    async fn public_url(&self, object_key: &str) -> Result<Option<String>, GatewayError>;
}
