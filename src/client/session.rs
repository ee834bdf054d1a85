use uuid::Uuid;

use crate::auth::dto::{AuthResponse, PublicUser};
use crate::profiles::repo_types::Profile;

/// A signed-in user. Passed explicitly to every authenticated call.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
    pub profile: Profile,
}

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}

impl From<AuthResponse> for Session {
    fn from(r: AuthResponse) -> Self {
        Self {
            access_token: r.access_token,
            refresh_token: r.refresh_token,
            user: r.user,
            profile: r.profile,
        }
    }
}
