use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{options::IndexOptions, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Credentials, HashedPassword, NewUser, PasswordReset, Role, User, UserPage, UserQuery,
};
use crate::repositories::UserStore;

const USERS_COLLECTION: &str = "users";

/// Fields matched by the free-text search
const SEARCH_FIELDS: [&str; 3] = ["firstName", "lastName", "position"];

/// User document as stored in MongoDB
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "_id")]
    id: bson::Uuid,
    first_name: String,
    last_name: String,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    position: String,
    #[serde(default)]
    role: Role,
    #[serde(default)]
    on_vacation: bool,
    #[serde(default)]
    on_holidays: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    away_till: Option<bson::DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_changed_at: Option<bson::DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_reset_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_reset_expires: Option<bson::DateTime>,
    created_at: bson::DateTime,
}

impl UserDocument {
    fn from_user(user: &User, password_hash: &HashedPassword) -> Self {
        Self {
            id: bson::Uuid::from(user.id),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            password: Some(password_hash.as_str().to_string()),
            position: user.position.clone(),
            role: user.role,
            on_vacation: user.on_vacation,
            on_holidays: user.on_holidays,
            away_till: user.away_till.map(bson::DateTime::from_time_0_3),
            password_changed_at: user.password_changed_at.map(bson::DateTime::from_time_0_3),
            password_reset_token: None,
            password_reset_expires: None,
            created_at: bson::DateTime::from_time_0_3(user.created_at),
        }
    }

    fn into_user(self) -> User {
        // A half-written reset state counts as no reset
        let password_reset = match (self.password_reset_token, self.password_reset_expires) {
            (Some(token_hash), Some(expires)) => Some(PasswordReset {
                token_hash,
                expires_at: expires.to_time_0_3(),
            }),
            _ => None,
        };

        User {
            id: self.id.to_uuid_1(),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            position: self.position,
            role: self.role,
            on_vacation: self.on_vacation,
            on_holidays: self.on_holidays,
            away_till: self.away_till.map(|d| d.to_time_0_3()),
            password_changed_at: self.password_changed_at.map(|d| d.to_time_0_3()),
            password_reset,
            created_at: self.created_at.to_time_0_3(),
        }
    }
}

/// Single `$count` bucket of a facet
#[derive(Debug, Deserialize)]
struct CountBucket {
    count: i64,
}

/// Output document of the listing `$facet` stage
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FacetResult {
    users: Vec<UserDocument>,
    users_on_vacation: Vec<CountBucket>,
    users_on_holidays: Vec<CountBucket>,
    total_users: Vec<CountBucket>,
}

fn facet_count(buckets: &[CountBucket]) -> u64 {
    buckets.first().map(|b| b.count.max(0) as u64).unwrap_or(0)
}

fn id_filter(id: Uuid) -> Document {
    doc! { "_id": bson::Uuid::from(id) }
}

/// Projection that keeps the password hash out of default reads
fn without_password() -> Document {
    doc! { "password": 0 }
}

/// `$match` document for the listing filters
fn match_filter(query: &UserQuery) -> Document {
    let mut filter = Document::new();

    if let Some(search) = &query.search {
        let pattern = regex::escape(search);
        let clauses: Vec<Document> = SEARCH_FIELDS
            .iter()
            .map(|field| {
                let mut clause = Document::new();
                clause.insert(*field, doc! { "$regex": pattern.as_str(), "$options": "i" });
                clause
            })
            .collect();
        filter.insert("$or", clauses);
    }
    if let Some(on_vacation) = query.on_vacation {
        filter.insert("onVacation", on_vacation);
    }
    if let Some(on_holidays) = query.on_holidays {
        filter.insert("onHolidays", on_holidays);
    }

    filter
}

/// Page of matching users and three collection-wide counts in one aggregation
fn facet_pipeline(query: &UserQuery) -> Vec<Document> {
    let skip = i64::try_from(query.skip).unwrap_or(i64::MAX);
    let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);

    vec![doc! {
        "$facet": {
            "users": [
                { "$match": match_filter(query) },
                { "$sort": { "createdAt": 1, "_id": 1 } },
                { "$skip": skip },
                { "$limit": limit },
                { "$project": without_password() }
            ],
            "usersOnVacation": [
                { "$match": { "onVacation": true } },
                { "$count": "count" }
            ],
            "usersOnHolidays": [
                { "$match": { "onHolidays": true } },
                { "$count": "count" }
            ],
            "totalUsers": [
                { "$count": "count" }
            ]
        }
    }]
}

/// MongoDB-backed user store
#[derive(Clone)]
pub struct MongoUserStore {
    collection: Collection<UserDocument>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<UserDocument>(USERS_COLLECTION),
        }
    }

    /// Create the unique email index and the listing indexes if missing
    pub async fn ensure_indexes(&self) -> AppResult<()> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        let lookups = [
            doc! { "firstName": 1, "lastName": 1 },
            doc! { "position": 1 },
            doc! { "onHolidays": 1 },
            doc! { "onVacation": 1 },
            doc! { "passwordResetToken": 1 },
        ];

        self.collection.create_index(unique_email).await?;
        for keys in lookups {
            self.collection
                .create_index(IndexModel::builder().keys(keys).build())
                .await?;
        }

        tracing::info!("User collection indexes ensured");
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, user: NewUser) -> AppResult<User> {
        let (user, password_hash) = user.into_user(OffsetDateTime::now_utc());
        let document = UserDocument::from_user(&user, &password_hash);

        self.collection.insert_one(&document).await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let document = self
            .collection
            .find_one(id_filter(id))
            .projection(without_password())
            .await?;

        Ok(document.map(UserDocument::into_user))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let document = self
            .collection
            .find_one(doc! { "email": email })
            .projection(without_password())
            .await?;

        Ok(document.map(UserDocument::into_user))
    }

    async fn find_credentials(&self, email: &str) -> AppResult<Option<Credentials>> {
        let Some(mut document) = self.collection.find_one(doc! { "email": email }).await? else {
            return Ok(None);
        };

        let password = document.password.take().ok_or_else(|| {
            AppError::Internal(format!("User {} has no stored password", document.id))
        })?;

        Ok(Some(Credentials {
            user: document.into_user(),
            password_hash: HashedPassword::new(password),
        }))
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> AppResult<Option<User>> {
        let filter = doc! {
            "passwordResetToken": token_hash,
            "passwordResetExpires": { "$gt": bson::DateTime::from_time_0_3(now) }
        };

        let document = self
            .collection
            .find_one(filter)
            .projection(without_password())
            .await?;

        Ok(document.map(UserDocument::into_user))
    }

    async fn set_password_reset(&self, id: Uuid, reset: Option<&PasswordReset>) -> AppResult<()> {
        let update = match reset {
            Some(reset) => doc! {
                "$set": {
                    "passwordResetToken": reset.token_hash.as_str(),
                    "passwordResetExpires": bson::DateTime::from_time_0_3(reset.expires_at)
                }
            },
            None => doc! {
                "$unset": { "passwordResetToken": "", "passwordResetExpires": "" }
            },
        };

        let result = self.collection.update_one(id_filter(id), update).await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("No user found with id: {}", id)));
        }

        Ok(())
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        token_hash: &str,
        password_hash: &HashedPassword,
        changed_at: OffsetDateTime,
    ) -> AppResult<bool> {
        let filter = doc! {
            "_id": bson::Uuid::from(id),
            "passwordResetToken": token_hash
        };
        let update = doc! {
            "$set": {
                "password": password_hash.as_str(),
                "passwordChangedAt": bson::DateTime::from_time_0_3(changed_at)
            },
            "$unset": { "passwordResetToken": "", "passwordResetExpires": "" }
        };

        let result = self.collection.update_one(filter, update).await?;

        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = self.collection.delete_one(id_filter(id)).await?;
        Ok(result.deleted_count > 0)
    }

    async fn search(&self, query: &UserQuery) -> AppResult<UserPage> {
        let mut cursor = self.collection.aggregate(facet_pipeline(query)).await?;

        let Some(document) = cursor.try_next().await? else {
            return Err(AppError::Database("Facet aggregation returned no document".to_string()));
        };
        let facets: FacetResult = bson::from_document(document)?;

        Ok(UserPage {
            total_users: facet_count(&facets.total_users),
            users_on_vacation: facet_count(&facets.users_on_vacation),
            users_on_holidays: facet_count(&facets.users_on_holidays),
            users: facets
                .users
                .into_iter()
                .map(UserDocument::into_user)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_filter_escapes_search() {
        let query = UserQuery {
            search: Some("a.b(".to_string()),
            on_vacation: Some(true),
            ..Default::default()
        };
        let filter = match_filter(&query);

        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 3);
        let first = clauses[0].as_document().unwrap();
        let regex = first.get_document("firstName").unwrap();
        assert_eq!(regex.get_str("$regex").unwrap(), r"a\.b\(");
        assert_eq!(regex.get_str("$options").unwrap(), "i");
        assert!(filter.get_bool("onVacation").unwrap());
        assert!(filter.get("onHolidays").is_none());
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(match_filter(&UserQuery::default()).is_empty());
    }

    #[test]
    fn test_facet_pipeline_paginates_users_only() {
        let query = UserQuery {
            skip: 40,
            limit: 20,
            ..Default::default()
        };
        let pipeline = facet_pipeline(&query);
        let facet = pipeline[0].get_document("$facet").unwrap();

        let users = facet.get_array("users").unwrap();
        let skip = users[2].as_document().unwrap();
        assert_eq!(skip.get_i64("$skip").unwrap(), 40);
        assert_eq!(facet.get_array("totalUsers").unwrap().len(), 1);
    }

    #[test]
    fn test_document_round_trip_keeps_reset_pair() {
        let now = OffsetDateTime::now_utc();
        let mut document = UserDocument {
            id: bson::Uuid::from(Uuid::new_v4()),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "grace@example.com".to_string(),
            password: None,
            position: "Admiral".to_string(),
            role: Role::Admin,
            on_vacation: false,
            on_holidays: true,
            away_till: None,
            password_changed_at: None,
            password_reset_token: Some("hash".to_string()),
            password_reset_expires: None,
            created_at: bson::DateTime::from_time_0_3(now),
        };

        // Token without expiry is not a usable reset
        let user = document.clone().into_user();
        assert!(user.password_reset.is_none());

        document.password_reset_expires = Some(bson::DateTime::from_time_0_3(now));
        let user = document.into_user();
        assert_eq!(user.password_reset.unwrap().token_hash, "hash");
        assert_eq!(user.role, Role::Admin);
    }
}
