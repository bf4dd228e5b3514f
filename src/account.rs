//! ログイン状態の管理

use crate::client::{ClientError, HttpCatalogClient};
use crate::error::{AppError, Result};
use crate::store::SessionStore;
use book_discovery_common::{Session, UserInfo};
use tracing::{info, warn};

/// ログインしてトークンを保存
pub async fn login(
    client: &HttpCatalogClient,
    store: &SessionStore,
    identifier: &str,
    password: &str,
) -> Result<Session> {
    let credential = client.login(identifier, password).await?;
    let session = Session::with_credential(credential);
    store.save(&session)?;
    info!(%identifier, "logged in");
    Ok(session)
}

/// 保存済みセッションを復元し、ユーザー情報を確認する
///
/// サーバーがトークンを拒否した場合は破棄して未ログインに戻す。
/// 通信できない場合はトークンを残す（ユーザー情報は `None`）。
pub async fn restore(
    client: &HttpCatalogClient,
    store: &SessionStore,
) -> Result<(Session, Option<UserInfo>)> {
    let mut session = store.load()?;
    if !session.is_authenticated() {
        return Ok((session, None));
    }

    let verified = client.user_info(session.credential()).await;
    match verified {
        Ok(user) => Ok((session, Some(user))),
        Err(e) if e.is_rejection() => {
            info!(error = %e, "stored token rejected, signing out");
            session.sign_out();
            store.clear()?;
            Ok((session, None))
        }
        Err(e) => {
            warn!(error = %e, "could not verify stored token");
            Ok((session, None))
        }
    }
}

pub fn logout(store: &SessionStore) -> Result<()> {
    store.clear()?;
    info!("logged out");
    Ok(())
}

// ---------------------------------------------
// 管理者
// ---------------------------------------------

/// 管理者としてログインし、利用者とは別の保存先に置く
pub async fn admin_login(
    client: &HttpCatalogClient,
    store: &SessionStore,
    identifier: &str,
    password: &str,
) -> Result<Session> {
    let credential = client.admin_login(identifier, password).await?;
    let session = Session::with_credential(credential);
    store.save(&session)?;
    info!(%identifier, "admin logged in");
    Ok(session)
}

/// 保存済みの管理者セッション
///
/// 管理者トークンは `/logininfo` で確認できないため、検証は各管理APIの応答に任せる。
pub fn admin_session(store: &SessionStore) -> Result<Session> {
    let session = store.load()?;
    if !session.is_authenticated() {
        return Err(AppError::AdminNotLoggedIn);
    }
    Ok(session)
}

/// 管理APIが 401 を返したら保存済みトークンを破棄する
pub fn discard_rejected_admin(store: &SessionStore, error: &AppError) -> Result<()> {
    if let AppError::Client(ClientError::Rejected { status: 401, .. }) = error {
        info!(error = %error, "admin token rejected, signing out");
        store.clear()?;
    }
    Ok(())
}
