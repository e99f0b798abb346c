use mongodb::bson::{doc, oid::ObjectId, DateTime};
use rocket::futures::TryStreamExt;

use crate::db::DbConn;
use crate::models::{Review, Tour, DEFAULT_RATINGS_AVERAGE, DEFAULT_RATINGS_QUANTITY};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub quantity: i32,
}

/// Aggregate a set of review ratings. An empty set falls back to the
/// tour schema defaults (4.5 / 0) rather than null, matching what a
/// tour looks like before its first review.
pub fn summarize(ratings: &[i32]) -> RatingSummary {
    if ratings.is_empty() {
        return RatingSummary {
            average: DEFAULT_RATINGS_AVERAGE,
            quantity: DEFAULT_RATINGS_QUANTITY,
        };
    }

    let quantity = ratings.len() as i32;
    let average = ratings.iter().map(|&r| r as f64).sum::<f64>() / quantity as f64;
    RatingSummary { average, quantity }
}

/// Keeps `Tour.ratings_average` / `Tour.ratings_quantity` consistent with
/// the current review set for that tour.
///
/// Called by the review routes after each committed create, update, or
/// delete. For update/delete the caller captures the review's tour id
/// before mutating, since a deleted review is no longer queryable.
///
/// Concurrent recomputes for the same tour are last-write-wins; the
/// recomputation is idempotent, so the next review mutation converges
/// the aggregate.
pub struct RatingAggregator;

impl RatingAggregator {
    pub async fn recompute(db: &DbConn, tour_id: ObjectId) -> Result<(), mongodb::error::Error> {
        let reviews: Vec<Review> = db
            .collection::<Review>("reviews")
            .find(doc! { "tour": tour_id }, None)
            .await?
            .try_collect()
            .await?;

        let ratings: Vec<i32> = reviews.iter().map(|r| r.rating).collect();
        let summary = summarize(&ratings);

        // An unknown tour id matches zero documents; that is not an error.
        db.collection::<Tour>("tours")
            .update_one(
                doc! { "_id": tour_id },
                doc! {
                    "$set": {
                        "ratings_average": summary.average,
                        "ratings_quantity": summary.quantity,
                        "updated_at": DateTime::now()
                    }
                },
                None,
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_resets_to_defaults() {
        let summary = summarize(&[]);
        assert_eq!(summary.average, 4.5);
        assert_eq!(summary.quantity, 0);
    }

    #[test]
    fn average_is_exact_mean() {
        let summary = summarize(&[5, 4, 3]);
        assert_eq!(summary.quantity, 3);
        assert_eq!(summary.average, 4.0);
    }

    #[test]
    fn recompute_is_idempotent_for_unchanged_set() {
        let ratings = [2, 4, 5, 5];
        let first = summarize(&ratings);
        let second = summarize(&ratings);
        assert_eq!(first.average, 4.0);
        assert_eq!(first.quantity, 4);
        assert_eq!(second, first);
    }

    #[test]
    fn deleting_reviews_shrinks_then_resets() {
        // [5, 5] -> delete one -> [5]
        let after_first_delete = summarize(&[5]);
        assert_eq!(after_first_delete.quantity, 1);
        assert_eq!(after_first_delete.average, 5.0);

        // delete the last one -> schema defaults
        let after_last_delete = summarize(&[]);
        assert_eq!(after_last_delete.average, 4.5);
        assert_eq!(after_last_delete.quantity, 0);
    }

    #[test]
    fn single_review_average_equals_its_rating() {
        for rating in 1..=5 {
            let summary = summarize(&[rating]);
            assert_eq!(summary.average, rating as f64);
            assert_eq!(summary.quantity, 1);
        }
    }
}
