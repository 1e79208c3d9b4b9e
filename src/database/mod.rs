pub mod memory;
pub mod mongo_store;
pub mod store;

pub use memory::MemoryUserStore;
pub use mongo_store::MongoUserStore;
pub use store::{ReplyOutcome, UserStore, VerificationUpdate};

use mongodb::{bson::Document, Client, Collection, Database};
use std::error::Error;

pub const USERS_COLLECTION: &str = "users";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));  // 5min idle

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(10));
        client_options.app_name = Some("anony-exchange".to_string());

        let default_db = client_options.default_database.clone();
        let client = Client::with_options(client_options)?;

        let db_name = default_db
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "anony_exchange".to_string());

        let db = client.database(&db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Unique indexes backing the identity invariants of the users collection
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<Document>(USERS_COLLECTION);

        for field in ["userId", "username", "email"] {
            let mut keys = Document::new();
            keys.insert(field, 1);

            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();

            match users.create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: users({}) unique", field),
                Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}
