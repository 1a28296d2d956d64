use crate::session::SessionSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Auth,
    Catalog,
    Watch(String),
    Profile,
    CreateMovie,
}

impl Route {
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').skip(1).collect();

        match segments.as_slice() {
            [] | [""] => Some(Self::Home),
            ["auth"] => Some(Self::Auth),
            ["movies"] => Some(Self::Catalog),
            ["movies", "new"] => Some(Self::CreateMovie),
            ["movies", id] if !id.is_empty() => Some(Self::Watch((*id).to_string())),
            ["profile"] => Some(Self::Profile),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".into(),
            Self::Auth => "/auth".into(),
            Self::Catalog => "/movies".into(),
            Self::Watch(id) => format!("/movies/{id}"),
            Self::Profile => "/profile".into(),
            Self::CreateMovie => "/movies/new".into(),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
    /// Session state is not known yet; show a placeholder.
    Loading,
}

/// Apply the route guards to `route` for the given session.
pub fn resolve(route: Route, session: &SessionSnapshot) -> Navigation {
    if session.loading {
        return Navigation::Loading;
    }
    let verified = session.is_verified();

    match route {
        Route::Home if verified => Navigation::Redirect(Route::Catalog),
        Route::Home => Navigation::Redirect(Route::Auth),
        Route::Auth if verified => Navigation::Redirect(Route::Catalog),
        Route::Auth => Navigation::Render(Route::Auth),
        _ if !verified => Navigation::Redirect(Route::Auth),
        Route::CreateMovie if !session.is_admin() => Navigation::Redirect(Route::Catalog),
        other => Navigation::Render(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::types::{AuthSession, Profile};

    fn signed_in(verified: bool, admin: bool) -> SessionSnapshot {
        SessionSnapshot {
            loading: false,
            session: Some(AuthSession {
                uid: "u1".into(),
                email: "ada@example.com".into(),
                email_verified: verified,
                token: "t".into(),
            }),
            profile: Some(Profile {
                uid: "u1".into(),
                email: "ada@example.com".into(),
                display_name: None,
                is_admin: admin,
                created_ts: 0,
            }),
        }
    }

    #[test]
    fn parse_paths() {
        assert_eq!(Route::parse("/"), Some(Route::Home));
        assert_eq!(Route::parse(""), Some(Route::Home));
        assert_eq!(Route::parse("/auth"), Some(Route::Auth));
        assert_eq!(Route::parse("/movies/"), Some(Route::Catalog));
        assert_eq!(Route::parse("/movies/new"), Some(Route::CreateMovie));
        assert_eq!(Route::parse("/movies/vid1?t=3"), Some(Route::Watch("vid1".into())));
        assert_eq!(Route::parse("/profile"), Some(Route::Profile));
        assert_eq!(Route::parse("/movies/a/b"), None);
        assert_eq!(Route::parse("/settings"), None);
    }

    #[test]
    fn path_round_trips() {
        for route in [
            Route::Home,
            Route::Auth,
            Route::Catalog,
            Route::Watch("vid1".into()),
            Route::Profile,
            Route::CreateMovie,
        ] {
            assert_eq!(Route::parse(&route.path()), Some(route));
        }
    }

    #[test]
    fn loading_session_reports_loading() {
        let loading = SessionSnapshot::loading();
        assert_eq!(resolve(Route::Catalog, &loading), Navigation::Loading);
        assert_eq!(resolve(Route::Home, &loading), Navigation::Loading);
    }

    #[test]
    fn home_redirects_by_session() {
        assert_eq!(
            resolve(Route::Home, &SessionSnapshot::signed_out()),
            Navigation::Redirect(Route::Auth)
        );
        assert_eq!(
            resolve(Route::Home, &signed_in(true, false)),
            Navigation::Redirect(Route::Catalog)
        );
    }

    #[test]
    fn protected_routes_need_verified_session() {
        let out = SessionSnapshot::signed_out();
        let unverified = signed_in(false, true);
        for route in [Route::Catalog, Route::Watch("x".into()), Route::Profile, Route::CreateMovie] {
            assert_eq!(resolve(route.clone(), &out), Navigation::Redirect(Route::Auth));
            assert_eq!(resolve(route, &unverified), Navigation::Redirect(Route::Auth));
        }
        assert_eq!(
            resolve(Route::Profile, &signed_in(true, false)),
            Navigation::Render(Route::Profile)
        );
    }

    #[test]
    fn create_requires_admin() {
        assert_eq!(
            resolve(Route::CreateMovie, &signed_in(true, false)),
            Navigation::Redirect(Route::Catalog)
        );
        assert_eq!(
            resolve(Route::CreateMovie, &signed_in(true, true)),
            Navigation::Render(Route::CreateMovie)
        );
    }

    #[test]
    fn auth_page_bounces_signed_in_users() {
        assert_eq!(
            resolve(Route::Auth, &signed_in(true, false)),
            Navigation::Redirect(Route::Catalog)
        );
        assert_eq!(
            resolve(Route::Auth, &signed_in(false, false)),
            Navigation::Render(Route::Auth)
        );
    }
}
