// Ring 1: Movie input validation
use async_trait::async_trait;

use crate::database::models::MovieDraft;
use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};

/// Required attributes, name length, ratings range and non-empty lists.
/// On update only the attributes present in the draft are checked.
#[derive(Default)]
pub struct MovieValidation;

#[async_trait]
impl Observer<MovieDraft> for MovieValidation {
    fn name(&self) -> &'static str {
        "MovieValidation"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::InputValidation
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        op.writes()
    }

    async fn execute(&self, ctx: &mut ObserverContext<MovieDraft>) -> Result<(), ObserverError> {
        let creating = ctx.operation == Operation::Create;
        let Some(draft) = ctx.record_mut() else {
            return Err(ObserverError::SystemError("No movie in context".to_string()));
        };

        let messages = validate(draft, creating);
        if messages.is_empty() {
            Ok(())
        } else {
            Err(ObserverError::ValidationError(messages))
        }
    }
}

fn validate(draft: &mut MovieDraft, creating: bool) -> Vec<String> {
    let mut messages = Vec::new();

    if let Some(name) = draft.name.as_mut() {
        *name = name.trim().to_string();
    }
    if let Some(description) = draft.description.as_mut() {
        *description = description.trim().to_string();
    }

    if creating {
        let required: [(bool, &str); 9] = [
            (draft.name.as_deref().map_or(true, str::is_empty), "Name is a required field!"),
            (
                draft.description.as_deref().map_or(true, str::is_empty),
                "Description is a required field!",
            ),
            (draft.duration.is_none(), "Duration is a required field!"),
            (draft.release_year.is_none(), "Release year is a required field!"),
            (draft.genres.is_none(), "Genres are required fields!"),
            (draft.directors.is_none(), "Directors are required fields!"),
            (draft.cover_image.is_none(), "Cover image is a required field!"),
            (draft.actors.is_none(), "Actors are required fields!"),
            (draft.price.is_none(), "Price is a required field!"),
        ];
        messages.extend(required.iter().filter(|(missing, _)| *missing).map(|(_, m)| m.to_string()));
    }

    if let Some(name) = draft.name.as_deref().filter(|n| !n.is_empty()) {
        let length = name.chars().count();
        if length < 4 {
            messages.push("Movie name must have at least 4 characters".to_string());
        } else if length > 100 {
            messages.push("Movie name must not exceed 100 characters".to_string());
        }
    }

    if let Some(Some(ratings)) = draft.ratings {
        if !(1.0..=10.0).contains(&ratings) {
            messages.push(format!("Ratings ({}) must be between 1.0 and 10", ratings));
        }
    }

    let lists = [
        (&draft.genres, "Genres"),
        (&draft.directors, "Directors"),
        (&draft.actors, "Actors"),
    ];
    for (list, label) in lists {
        if list.as_ref().is_some_and(|l| l.iter().all(|v| v.trim().is_empty())) {
            messages.push(format!("{} must not be empty", label));
        }
    }

    if draft.duration.is_some_and(|d| d < 0) {
        messages.push("Duration must not be negative".to_string());
    }
    if draft.price.is_some_and(|p| p < 0.0) {
        messages.push("Price must not be negative".to_string());
    }

    messages
}
