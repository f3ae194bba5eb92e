use tracing::debug;

use crate::auth::SessionContext;
use crate::backend::Backend;
use crate::types::{ProfileField, ProfileForm};

/// Status shown after a successful save.
pub const PROFILE_UPDATED: &str = "Profile updated!";

/// The nutrition profile editor.
#[derive(Debug, Clone, Default)]
pub struct ProfileView {
    form: ProfileForm,
    saved: ProfileForm,
    status: Option<String>,
}

impl ProfileView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&self) -> &ProfileForm {
        &self.form
    }

    /// The last status message, if any.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// True when the form differs from what was last loaded or saved.
    pub fn is_dirty(&self) -> bool {
        self.form != self.saved
    }

    /// A readable summary of the form.
    pub fn summary(&self) -> String {
        self.form.summary()
    }

    /// Loads the profile into the form.  Missing fields become empty strings.
    pub async fn mount(&mut self, context: &SessionContext, backend: &dyn Backend) {
        let session = match context.require_session() {
            Ok(session) => session,
            Err(err) => {
                self.status = Some(err.to_string());
                return;
            }
        };
        match backend.get_profile(session).await {
            Ok(profile) => {
                self.form = ProfileForm::from(profile);
                self.saved = self.form.clone();
            }
            Err(err) => {
                debug!(error = %err, "profile load failed");
                self.status = Some(err.to_string());
            }
        }
    }

    pub fn set_field(&mut self, field: ProfileField, value: impl Into<String>) {
        self.form.set(field, value);
    }

    /// Sends the whole form.
    pub async fn save(&mut self, context: &SessionContext, backend: &dyn Backend) {
        let session = match context.require_session() {
            Ok(session) => session,
            Err(err) => {
                self.status = Some(err.to_string());
                return;
            }
        };
        match backend.update_profile(session, &self.form).await {
            Ok(_) => {
                self.saved = self.form.clone();
                self.status = Some(PROFILE_UPDATED.to_string());
            }
            Err(err) => {
                debug!(error = %err, "profile save failed");
                self.status = Some(err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::{MockBackend, test_session};
    use crate::types::Profile;

    fn signed_in() -> SessionContext {
        SessionContext::authenticated(test_session())
    }

    fn backend() -> MockBackend {
        MockBackend::new().with_profile(Profile {
            fitness_goals: Some("lose weight".to_string()),
            dietary_restrictions: Some("vegan".to_string()),
        })
    }

    #[tokio::test]
    async fn mount_populates_form() {
        let backend = backend();
        let mut view = ProfileView::new();
        view.mount(&signed_in(), &backend).await;
        assert_eq!(view.form().fitness_goals, "lose weight");
        assert_eq!(view.form().dietary_restrictions, "vegan");
        assert_eq!(view.status(), None);
        assert!(!view.is_dirty());
    }

    #[tokio::test]
    async fn save_sends_whole_form() {
        let backend = backend();
        let mut view = ProfileView::new();
        view.mount(&signed_in(), &backend).await;
        view.set_field(ProfileField::FitnessGoals, "gain muscle");
        assert!(view.is_dirty());
        view.save(&signed_in(), &backend).await;
        assert_eq!(view.status(), Some(PROFILE_UPDATED));
        assert!(!view.is_dirty());
        assert_eq!(
            backend.saved_profile(),
            Some(ProfileForm {
                fitness_goals: "gain muscle".to_string(),
                dietary_restrictions: "vegan".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn errors_land_in_status() {
        let backend = backend().failing("update_profile", Error::api(422, "invalid profile"));
        let mut view = ProfileView::new();
        view.mount(&signed_in(), &backend).await;
        view.save(&signed_in(), &backend).await;
        assert_eq!(view.status(), Some("invalid profile"));

        let mut view = ProfileView::new();
        view.mount(&SessionContext::unauthenticated(), &backend).await;
        assert_eq!(view.status(), Some("Not signed in"));
    }

    #[tokio::test]
    async fn summary_marks_blank_fields() {
        let backend = MockBackend::new();
        let mut view = ProfileView::new();
        view.mount(&signed_in(), &backend).await;
        view.set_field(ProfileField::DietaryRestrictions, "halal");
        assert_eq!(
            view.summary(),
            "User Profile Context\n- Fitness Goals: Not provided\n- Dietary Restrictions: halal"
        );
    }
}
