//! The auth-route guard.
//!
//! Wraps the sign-in/sign-up routes: an authenticated visitor must never see
//! the auth forms, and is sent to the home route exactly once.

use voxboard_session::SessionPhase;

/// Where authenticated visitors to the auth routes are sent.
pub const HOME_ROUTE: &str = "/";

/// What the auth layout should do for the current session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session unresolved, or already redirected — render nothing.
    RenderNothing,
    /// Authenticated: render nothing and navigate to [`HOME_ROUTE`].
    RedirectHome,
    /// Anonymous: render the sign-in/sign-up forms.
    RenderAuthForms,
}

/// Three-state guard over the auth routes.
///
/// The redirect is edge-triggered: one `RedirectHome` per authenticated
/// visit, re-armed when the session drops back to anonymous.
#[derive(Debug, Default)]
pub struct RouteGuard {
    redirected: bool,
}

impl RouteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decide(&mut self, phase: &SessionPhase) -> GuardDecision {
        match phase {
            SessionPhase::Resolving => GuardDecision::RenderNothing,
            SessionPhase::Anonymous => {
                self.redirected = false;
                GuardDecision::RenderAuthForms
            }
            SessionPhase::Authenticated { .. } => {
                if self.redirected {
                    GuardDecision::RenderNothing
                } else {
                    self.redirected = true;
                    GuardDecision::RedirectHome
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxboard_types::{AuthSession, AuthUser, User};

    fn authenticated() -> SessionPhase {
        SessionPhase::Authenticated {
            user: User {
                userid: "u-1".into(),
                email: "m@example.com".into(),
                name: "M".into(),
                fullname: None,
                user_type: None,
                phone_number: None,
            },
            session: AuthSession {
                access_token: "at".into(),
                refresh_token: "rt".into(),
                expires_at: 0,
                user: AuthUser {
                    id: "u-1".into(),
                    email: None,
                },
            },
        }
    }

    #[test]
    fn unresolved_renders_nothing() {
        let mut guard = RouteGuard::new();
        assert_eq!(
            guard.decide(&SessionPhase::Resolving),
            GuardDecision::RenderNothing
        );
    }

    #[test]
    fn anonymous_renders_the_forms() {
        let mut guard = RouteGuard::new();
        assert_eq!(
            guard.decide(&SessionPhase::Anonymous),
            GuardDecision::RenderAuthForms
        );
    }

    #[test]
    fn authenticated_redirects_exactly_once() {
        let mut guard = RouteGuard::new();
        let phase = authenticated();
        assert_eq!(guard.decide(&phase), GuardDecision::RedirectHome);
        assert_eq!(guard.decide(&phase), GuardDecision::RenderNothing);
        assert_eq!(guard.decide(&phase), GuardDecision::RenderNothing);
    }

    #[test]
    fn redirect_rearms_after_sign_out() {
        let mut guard = RouteGuard::new();
        let phase = authenticated();
        assert_eq!(guard.decide(&phase), GuardDecision::RedirectHome);
        assert_eq!(
            guard.decide(&SessionPhase::Anonymous),
            GuardDecision::RenderAuthForms
        );
        assert_eq!(guard.decide(&phase), GuardDecision::RedirectHome);
    }
}
