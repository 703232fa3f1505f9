//! Shapes of the `data` member in success responses.
use serde_json::{json, Value};

use crate::database::models::{GenreGroup, Movie, MovieStats, User};

pub fn movie_data(movie: &Movie) -> Value {
    json!({ "movie": movie.to_document() })
}

pub fn movies_data(movies: Vec<Value>) -> Value {
    json!({ "movies": movies })
}

pub fn user_data(user: &User) -> Value {
    json!({ "user": user })
}

pub fn users_data(users: &[User]) -> Value {
    json!({ "users": users })
}

pub fn stats_data(stats: &[MovieStats]) -> Value {
    json!({ "stats": stats })
}

pub fn genre_data(groups: &[GenreGroup]) -> Value {
    json!({ "movies": groups })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_use_public_names() {
        let stats = vec![MovieStats {
            release_year: 2010,
            avg_rating: Some(8.5),
            avg_price: Some(20.0),
            min_price: Some(15.0),
            max_price: Some(25.0),
            price_total: Some(40.0),
            min_rating: Some(8.0),
            max_rating: Some(9.0),
            rating_total: Some(17.0),
            movie_count: 2,
        }];
        let data = stats_data(&stats);
        assert_eq!(data["stats"][0]["releaseYear"], 2010);
        assert_eq!(data["stats"][0]["movieCount"], 2);
        assert_eq!(data["stats"][0]["minPrice"], 15.0);
    }

    #[test]
    fn genre_groups() {
        let groups = vec![GenreGroup { genre: "Drama".into(), movie_count: 1, movies: vec!["Up".into()] }];
        assert_eq!(genre_data(&groups), json!({ "movies": [{ "genre": "Drama", "movieCount": 1, "movies": ["Up"] }] }));
    }
}
