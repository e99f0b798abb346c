use mongodb::{Client, Database, IndexModel};
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use rocket::fairing::AdHoc;
use log::{error, info};

use crate::models::{Booking, Review};

pub fn init() -> AdHoc {
    AdHoc::on_ignite("MongoDB", |rocket| async {
        match connect().await {
            Ok(database) => {
                info!("✓ MongoDB connected successfully");
                if let Err(e) = ensure_indexes(&database).await {
                    error!("✗ Failed to create indexes: {}", e);
                }
                rocket.manage(database)
            }
            Err(e) => {
                error!("✗ Failed to connect to MongoDB: {}", e);
                rocket
            }
        }
    })
}

async fn connect() -> Result<Database, mongodb::error::Error> {
    let uri = crate::config::Config::mongodb_uri();
    let client = Client::with_uri_str(&uri).await?;

    // Test connection
    client
        .database("admin")
        .run_command(doc! {"ping": 1}, None)
        .await?;

    Ok(client.database("tourbook"))
}

/// One review and one booking per (tour, user) pair, enforced by the store.
async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let unique_tour_user = || {
        IndexModel::builder()
            .keys(doc! { "tour": 1, "user": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build()
    };

    db.collection::<Review>("reviews")
        .create_index(unique_tour_user(), None)
        .await?;
    db.collection::<Booking>("bookings")
        .create_index(unique_tour_user(), None)
        .await?;

    let unique_email = IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    db.collection::<crate::models::User>("users")
        .create_index(unique_email, None)
        .await?;

    let unique_tour_name = IndexModel::builder()
        .keys(doc! { "name": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    db.collection::<crate::models::Tour>("tours")
        .create_index(unique_tour_name, None)
        .await?;

    info!("✓ Unique indexes ensured");
    Ok(())
}

pub type DbConn = Database;
