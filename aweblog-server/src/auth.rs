use crate::models::User;
use aweblog_core::Request;
use aweblog_data::{Db, Model, SqlValue};
use sha1::{Digest, Sha1};
use std::time::{SystemTime, UNIX_EPOCH};

pub const COOKIE_NAME: &str = "awesession";

/// Replacement for the credential field whenever a user leaves this layer.
pub const MASKED_PASSWD: &str = "******";

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn sha1_hex(input: &str) -> String {
    hex::encode(Sha1::digest(input.as_bytes()))
}

/// Stored form of a password: sha1 over `"<uid>:<passwd>"`.
pub fn password_digest(uid: &str, passwd: &str) -> String {
    sha1_hex(&format!("{uid}:{passwd}"))
}

/// Keyed digest binding a cookie to the user's current credential and the
/// server secret.
fn cookie_digest(uid: &str, passwd: &str, expires: u64, secret: &str) -> String {
    sha1_hex(&format!("{uid}-{passwd}-{expires}-{secret}"))
}

/// Encode a signed session cookie for `user`, valid for `max_age` seconds:
/// `"<id>-<expiry_epoch_secs>-<hex_digest>"`.
pub fn user_to_cookie(user: &User, max_age: u64, secret: &str) -> Option<String> {
    let id = user.id.as_deref()?;
    let passwd = user.passwd.as_deref()?;
    let expires = epoch_secs() + max_age;
    Some(format!(
        "{id}-{expires}-{}",
        cookie_digest(id, passwd, expires, secret)
    ))
}

/// Verify a session cookie and load its user.
///
/// Any defect — wrong shape, past expiry, unknown user, digest mismatch
/// against the currently stored credential — yields `None`, never a partial
/// user. The returned user has its credential masked.
pub async fn cookie_to_user(db: &Db, cookie: &str, secret: &str) -> Option<User> {
    let segments: Vec<&str> = cookie.split('-').collect();
    let &[uid, expires, sha] = segments.as_slice() else {
        return None;
    };
    let expires: u64 = expires.parse().ok()?;
    if expires < epoch_secs() {
        return None;
    }
    let mut user = match User::find(db, SqlValue::Text(uid.to_string())).await {
        Ok(Some(user)) => user,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(error = %err, "cookie user lookup failed");
            return None;
        }
    };
    let passwd = user.passwd.as_deref()?;
    if sha != cookie_digest(uid, passwd, expires, secret) {
        tracing::info!("invalid cookie digest");
        return None;
    }
    user.passwd = Some(MASKED_PASSWD.to_string());
    Some(user)
}

/// Session user from the request cookie, if any.
pub async fn current_user(db: &Db, request: &Request, secret: &str) -> Option<User> {
    let cookie = request.cookie(COOKIE_NAME)?;
    cookie_to_user(db, &cookie, secret).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedDb;
    use aweblog_data::Row;

    const SECRET: &str = "test-secret";

    fn stored_user() -> User {
        User {
            id: Some("u1".to_string()),
            email: Some("a@b.com".to_string()),
            passwd: Some(password_digest("u1", "hunter2")),
            admin: Some(false),
            name: Some("Alice".to_string()),
            image: Some("about:blank".to_string()),
            created_at: Some(100.0),
        }
    }

    fn user_row(user: &User) -> Row {
        Row::from_pairs(vec![
            ("id".to_string(), SqlValue::Text(user.id.clone().unwrap())),
            (
                "email".to_string(),
                SqlValue::Text(user.email.clone().unwrap()),
            ),
            (
                "passwd".to_string(),
                SqlValue::Text(user.passwd.clone().unwrap()),
            ),
            ("admin".to_string(), SqlValue::Int(0)),
            (
                "name".to_string(),
                SqlValue::Text(user.name.clone().unwrap()),
            ),
            (
                "image".to_string(),
                SqlValue::Text(user.image.clone().unwrap()),
            ),
            ("created_at".to_string(), SqlValue::Float(100.0)),
        ])
    }

    #[tokio::test]
    async fn cookie_round_trip_masks_the_credential() {
        let user = stored_user();
        let cookie = user_to_cookie(&user, 60, SECRET).unwrap();
        let db = ScriptedDb::with_rows(vec![user_row(&user)]);
        let loaded = cookie_to_user(&db, &cookie, SECRET).await.unwrap();
        assert_eq!(loaded.id, user.id);
        assert_eq!(loaded.passwd.as_deref(), Some(MASKED_PASSWD));
    }

    #[tokio::test]
    async fn tampered_segments_yield_no_user() {
        let user = stored_user();
        let cookie = user_to_cookie(&user, 60, SECRET).unwrap();
        let segments: Vec<&str> = cookie.split('-').collect();
        let &[uid, expires, sha] = segments.as_slice() else {
            panic!("cookie shape changed");
        };

        for forged in [
            format!("u2-{expires}-{sha}"),
            format!("{uid}-{}-{sha}", expires.parse::<u64>().unwrap() + 1),
            format!("{uid}-{expires}-{}", "0".repeat(40)),
            format!("{uid}-{expires}"),
        ] {
            let db = ScriptedDb::with_rows(vec![user_row(&user)]);
            assert!(
                cookie_to_user(&db, &forged, SECRET).await.is_none(),
                "forged cookie accepted: {forged}"
            );
        }
    }

    #[tokio::test]
    async fn expired_cookie_yields_no_user() {
        let user = stored_user();
        let expires = epoch_secs() - 1;
        let passwd = user.passwd.as_deref().unwrap();
        let cookie = format!(
            "u1-{expires}-{}",
            cookie_digest("u1", passwd, expires, SECRET)
        );
        let db = ScriptedDb::with_rows(vec![user_row(&user)]);
        assert!(cookie_to_user(&db, &cookie, SECRET).await.is_none());
    }

    #[tokio::test]
    async fn stale_credential_invalidates_the_cookie() {
        // cookie minted against the old password no longer verifies
        let mut user = stored_user();
        let cookie = user_to_cookie(&user, 60, SECRET).unwrap();
        user.passwd = Some(password_digest("u1", "changed"));
        let db = ScriptedDb::with_rows(vec![user_row(&user)]);
        assert!(cookie_to_user(&db, &cookie, SECRET).await.is_none());
    }

    #[tokio::test]
    async fn unknown_user_yields_no_user() {
        let user = stored_user();
        let cookie = user_to_cookie(&user, 60, SECRET).unwrap();
        let db = ScriptedDb::with_rows(vec![]);
        assert!(cookie_to_user(&db, &cookie, SECRET).await.is_none());
    }
}
