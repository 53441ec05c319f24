//! Cache-first catalog autocomplete for `/log` media names.

use crate::framework::{media_kind_from_option, sibling_option, AppContext};
use kotori_common::utils::truncate;
use kotori_media::{Catalog, MediaKind};
use poise::serenity_prelude::AutocompleteChoice;
use tracing::warn;

const MAX_CHOICES: usize = 10;

fn choice(title: &str, id: impl std::fmt::Display, suffix: &str) -> AutocompleteChoice {
    AutocompleteChoice::new(
        format!("{} (ID: {id}){suffix}", truncate(title, 80)),
        id.to_string(),
    )
}

/// Autocomplete for the `/log` name parameter.
///
/// Routes to the media kind's catalog; kinds without a catalog (and inputs
/// shorter than two characters) complete to nothing.
pub async fn log_name_autocomplete(ctx: AppContext<'_>, partial: &str) -> Vec<AutocompleteChoice> {
    let input = partial.trim();
    if input.len() <= 1 {
        return Vec::new();
    }
    let Some(kind) = sibling_option(&ctx, "media_type").and_then(media_kind_from_option) else {
        return Vec::new();
    };

    let result = match kind.catalog() {
        Some(Catalog::Anilist) => anilist_choices(&ctx, kind, input).await,
        Some(Catalog::Vndb) => vndb_choices(&ctx, input).await,
        Some(Catalog::Tmdb) => tmdb_choices(&ctx, input).await,
        None => Ok(Vec::new()),
    };

    match result {
        Ok(mut choices) => {
            choices.truncate(MAX_CHOICES);
            choices
        }
        Err(e) => {
            warn!("Autocomplete lookup failed: {e}");
            Vec::new()
        }
    }
}

async fn anilist_choices(
    ctx: &AppContext<'_>,
    kind: MediaKind,
    input: &str,
) -> kotori_common::Result<Vec<AutocompleteChoice>> {
    let data = ctx.data;
    let media_type = kind.anilist_type().unwrap_or("ANIME");

    if let Ok(id) = input.parse::<i64>() {
        if let Some(entry) = data.db.anilist_by_id(id, media_type).await? {
            let title = entry
                .title_english
                .or(entry.title_native)
                .unwrap_or_default();
            return Ok(vec![choice(&title, id, "")]);
        }
        let Some(media) = data.anilist.by_id(id).await? else {
            return Ok(Vec::new());
        };
        data.db
            .upsert_anilist(
                media.id,
                media.title_english.as_deref(),
                media.title_native.as_deref(),
                media.cover_image_url.as_deref(),
                media_type,
            )
            .await?;
        let title = media.title().unwrap_or_default().to_string();
        return Ok(vec![choice(&title, media.id, "")]);
    }

    let mut choices = Vec::new();
    for entry in data.db.search_anilist(input, media_type).await? {
        let title = entry
            .title_english
            .or(entry.title_native)
            .unwrap_or_default();
        choices.push(choice(&title, entry.anilist_id, ""));
    }

    // Cache came up short: top up from the API
    if choices.len() < 3 {
        for media in data.anilist.search(input, media_type).await? {
            data.db
                .upsert_anilist(
                    media.id,
                    media.title_english.as_deref(),
                    media.title_native.as_deref(),
                    media.cover_image_url.as_deref(),
                    media_type,
                )
                .await?;
            let title = media.title().unwrap_or_default().to_string();
            choices.push(choice(&title, media.id, ""));
        }
    }
    Ok(choices)
}

async fn vndb_choices(
    ctx: &AppContext<'_>,
    input: &str,
) -> kotori_common::Result<Vec<AutocompleteChoice>> {
    let data = ctx.data;

    if let Some(id) = kotori_media::vndb::normalize_vndb_id(input) {
        if let Some(entry) = data.db.vndb_by_id(&id).await? {
            return Ok(vec![choice(&entry.title, entry.vndb_id, " (Cached)")]);
        }
        let Some(vn) = data.vndb.by_id(&id).await? else {
            return Ok(Vec::new());
        };
        data.db
            .upsert_vndb(
                &vn.id,
                &vn.title,
                vn.cover_image_url.as_deref(),
                vn.cover_image_nsfw,
            )
            .await?;
        return Ok(vec![choice(&vn.title, vn.id, " (API)")]);
    }

    let mut choices = Vec::new();
    for entry in data.db.search_vndb(input).await? {
        choices.push(choice(&entry.title, entry.vndb_id, " (Cached)"));
    }
    if choices.is_empty() {
        for vn in data.vndb.search(input).await? {
            data.db
                .upsert_vndb(
                    &vn.id,
                    &vn.title,
                    vn.cover_image_url.as_deref(),
                    vn.cover_image_nsfw,
                )
                .await?;
            choices.push(choice(&vn.title, vn.id, " (API)"));
        }
    }
    Ok(choices)
}

async fn tmdb_choices(
    ctx: &AppContext<'_>,
    input: &str,
) -> kotori_common::Result<Vec<AutocompleteChoice>> {
    let data = ctx.data;

    let mut choices = Vec::new();
    for entry in data.db.search_tmdb(input).await? {
        choices.push(choice(&entry.title, entry.tmdb_id, ""));
    }
    if choices.len() < 3 {
        if let Some(tmdb) = &data.tmdb {
            for media in tmdb.search(input).await? {
                data.db
                    .upsert_tmdb(
                        media.id,
                        &media.title,
                        media.original_title.as_deref(),
                        &media.media_type,
                        media.poster_url.as_deref(),
                    )
                    .await?;
                choices.push(choice(&media.title, media.id, ""));
            }
        }
    }
    Ok(choices)
}

/// Resolve the display title for a logged name: the cached catalog title
/// when the name is a known catalog id, otherwise the name itself.
pub async fn resolve_title(data: &crate::framework::Data, kind: MediaKind, name: &str) -> String {
    let resolved = match kind.catalog() {
        Some(Catalog::Anilist) => match name.parse::<i64>() {
            Ok(id) => data.db.anilist_title(id).await.ok().flatten(),
            Err(_) => None,
        },
        Some(Catalog::Vndb) => data.db.vndb_title(name).await.ok().flatten(),
        Some(Catalog::Tmdb) => match name.parse::<i64>() {
            Ok(id) => data.db.tmdb_title(id).await.ok().flatten(),
            Err(_) => None,
        },
        None => None,
    };
    resolved.unwrap_or_else(|| name.to_string())
}

/// Cached thumbnail for a logged name, when the name is a known catalog id.
pub async fn resolve_thumbnail(
    data: &crate::framework::Data,
    kind: MediaKind,
    name: &str,
) -> Option<String> {
    match kind.catalog() {
        Some(Catalog::Anilist) => {
            let id = name.parse::<i64>().ok()?;
            data.db.anilist_thumbnail(id).await.ok().flatten()
        }
        Some(Catalog::Vndb) => data.db.vndb_thumbnail(name).await.ok().flatten(),
        Some(Catalog::Tmdb) => {
            let id = name.parse::<i64>().ok()?;
            data.db.tmdb_thumbnail(id).await.ok().flatten()
        }
        None => None,
    }
}

/// Public catalog page for a logged name, when it resolves in the cache.
pub async fn resolve_source_url(
    data: &crate::framework::Data,
    kind: MediaKind,
    name: &str,
) -> Option<String> {
    match kind.catalog() {
        Some(Catalog::Anilist) => {
            let id = name.parse::<i64>().ok()?;
            data.db.anilist_title(id).await.ok().flatten()?;
            kind.source_url(name, None)
        }
        Some(Catalog::Vndb) => {
            data.db.vndb_title(name).await.ok().flatten()?;
            kind.source_url(name, None)
        }
        Some(Catalog::Tmdb) => {
            let id = name.parse::<i64>().ok()?;
            let media_type = data.db.tmdb_media_type(id).await.ok().flatten()?;
            kind.source_url(name, Some(&media_type))
        }
        None => None,
    }
}
