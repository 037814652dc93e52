use thiserror::Error;

use crate::error::Error;
use crate::inbox::loader::InboxLoader;
use crate::mail::MailApi;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// The purge did not go through; the listing was left as it was.
    #[error("could not refresh the inbox: {0}")]
    Purge(Error),
    /// The server cache is already purged but page 1 could not be loaded.
    /// The listing now shows the error until the next successful load.
    #[error("inbox refreshed on the server but reloading failed: {0}")]
    Reload(Error),
}

impl RefreshError {
    pub fn source_error(&self) -> &Error {
        match self {
            RefreshError::Purge(e) | RefreshError::Reload(e) => e,
        }
    }
}

/// Purge-then-reload. The two steps are not atomic: between a successful
/// purge and a failed reload the backend has forgotten its cache while the
/// client shows an error instead of fresh data.
pub fn refresh(api: &MailApi, loader: &mut InboxLoader) -> Result<usize, RefreshError> {
    log::info!("purging server-side inbox cache");
    api.purge_cache().map_err(RefreshError::Purge)?;
    let items = loader.load_initial(api).map_err(RefreshError::Reload)?;
    log::info!("inbox reloaded with {} emails", items.len());
    Ok(items.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbox::loader::LoadPhase;
    use crate::mail::testing::{api_with, logged_in_api, page_json};

    fn loaded_two_pages(api: &MailApi) -> InboxLoader {
        let mut loader = InboxLoader::new(2);
        loader.load_initial(api).unwrap();
        loader.load_more(api).unwrap();
        loader
    }

    #[test]
    fn refresh_replaces_all_pages_with_fresh_first_page() {
        let (api, t) = logged_in_api();
        t.push_ok(&page_json(1, true, &["4", "3"]));
        t.push_ok(&page_json(2, true, &["2", "1"]));
        let mut loader = loaded_two_pages(&api);

        t.push_ok(r#"{"success":true,"message":"Cache refreshed successfully"}"#);
        t.push_ok(&page_json(1, true, &["5", "4"]));
        assert_eq!(refresh(&api, &mut loader), Ok(2));

        let ids: Vec<_> = loader.items().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["5", "4"]);
        assert_eq!(loader.page(), 1);
        let paths: Vec<_> = t.requests().iter().map(|r| r.path()).collect();
        assert_eq!(paths[2..], ["/refresh-cache", "/fetch-emails"]);
    }

    #[test]
    fn failed_purge_leaves_listing_untouched() {
        let (api, t) = logged_in_api();
        t.push_ok(&page_json(1, true, &["4", "3"]));
        t.push_ok(&page_json(2, false, &["2", "1"]));
        let mut loader = loaded_two_pages(&api);

        t.push(503, "");
        let err = refresh(&api, &mut loader).unwrap_err();
        assert!(matches!(err, RefreshError::Purge(Error::Server { status: 503, .. })));
        assert_eq!(loader.items().len(), 4);
        assert_eq!(loader.page(), 2);
        assert_eq!(loader.phase(), &LoadPhase::Loaded);
        assert_eq!(t.requests().len(), 3);
    }

    #[test]
    fn failed_reload_after_purge_is_reported_as_such() {
        let (api, t) = logged_in_api();
        t.push_ok(&page_json(1, true, &["4", "3"]));
        t.push_ok(&page_json(2, false, &["2", "1"]));
        let mut loader = loaded_two_pages(&api);

        t.push_ok(r#"{"success":true}"#);
        t.push_network_error();
        let err = refresh(&api, &mut loader).unwrap_err();
        assert!(matches!(err, RefreshError::Reload(Error::Network(_))));
        assert!(loader.items().is_empty());
        assert!(matches!(loader.phase(), LoadPhase::Errored(_)));
    }

    #[test]
    fn refresh_without_session_never_hits_network() {
        let (api, t) = api_with(None);
        let mut loader = InboxLoader::new(20);
        let err = refresh(&api, &mut loader).unwrap_err();
        assert_eq!(err.source_error(), &Error::Unauthenticated);
        assert!(t.requests().is_empty());
    }
}
