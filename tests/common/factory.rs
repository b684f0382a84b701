use uuid::Uuid;

use roster::models::{CreateUser, Role, User};
use roster::state::AppState;

/// Password every factory user is created with
pub const TEST_PASSWORD: &str = "TestPassword123!";

/// Authentication info for tests
#[allow(dead_code)]
pub struct TestAuth {
    pub user: User,
    pub token: String,
}

impl TestAuth {
    /// Get the Authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Factory for creating test data
pub struct Factory<'a> {
    state: &'a AppState,
}

#[allow(dead_code)]
impl<'a> Factory<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn input(email: String, role: Role) -> CreateUser {
        let unique_id = Uuid::new_v4().simple().to_string();
        CreateUser {
            first_name: format!("Test{}", &unique_id[..6]),
            last_name: "User".to_string(),
            email,
            password: TEST_PASSWORD.to_string(),
            position: "Tester".to_string(),
            role,
            on_vacation: false,
            on_holidays: false,
            away_till: None,
        }
    }

    fn unique_email() -> String {
        format!("test-{}@example.com", Uuid::new_v4())
    }

    /// Create a regular user and return auth info
    pub async fn create_user(&self) -> TestAuth {
        self.create_with_role(Role::User).await
    }

    /// Create an admin and return auth info
    pub async fn create_admin(&self) -> TestAuth {
        self.create_with_role(Role::Admin).await
    }

    async fn create_with_role(&self, role: Role) -> TestAuth {
        let user = self
            .state
            .directory
            .create(Self::input(Self::unique_email(), role))
            .await
            .unwrap();
        let token = self.state.tokens.issue(user.id).unwrap();

        TestAuth { user, token }
    }

    /// Create a user with specific email
    pub async fn create_user_with_email(&self, email: &str) -> User {
        self.state
            .directory
            .create(Self::input(email.to_string(), Role::User))
            .await
            .unwrap()
    }

    /// Create a user with explicit names and availability flags
    pub async fn create_profile(
        &self,
        first_name: &str,
        last_name: &str,
        position: &str,
        on_vacation: bool,
        on_holidays: bool,
    ) -> User {
        let input = CreateUser {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            position: position.to_string(),
            on_vacation,
            on_holidays,
            ..Self::input(Self::unique_email(), Role::User)
        };

        self.state.directory.create(input).await.unwrap()
    }
}
