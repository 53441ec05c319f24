//! Member-owned custom roles.

use crate::framework::{Context, Data, Error};
use kotori_common::utils::{join_ids, parse_hex_color, split_ids};
use poise::serenity_prelude as serenity;
use serenity::{
    ComponentInteractionDataKind, CreateActionRow, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateSelectMenu, CreateSelectMenuKind, EditRole,
    Mentionable,
};
use std::time::Duration;
use tracing::{debug, info};

const MAX_ROLE_NAME_LEN: usize = 14;

/// Delete a member's custom role and its record.
async fn clear_custom_role(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user_id: i64,
    role_id: i64,
) -> Result<(), Error> {
    if let Err(e) = guild_id
        .delete_role(&ctx.http, serenity::RoleId::new(role_id as u64))
        .await
    {
        debug!("Custom role {role_id} already gone: {e}");
    }
    data.db.delete_custom_role(guild_id.get() as i64, user_id).await?;
    Ok(())
}

/// Create a custom role for yourself.
#[poise::command(slash_command, guild_only)]
pub async fn make_custom_role(
    ctx: Context<'_>,
    #[description = "Role name. Maximum of 14 symbols."] role_name: String,
    #[description = "Hex color code. Example: #A47267"] color_code: String,
    #[description = "Image that should be used."] role_icon: Option<serenity::Attachment>,
) -> Result<(), Error> {
    ctx.defer().await?;
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();

    let Some(settings) = data.db.custom_role_settings(guild_id.get() as i64).await? else {
        ctx.say("Custom role settings are missing. Please ask an admin to set them up.")
            .await?;
        return Ok(());
    };

    let guild_roles = ctx.http().get_guild_roles(guild_id).await?;
    let Some(reference_role) = guild_roles
        .iter()
        .find(|role| role.id.get() as i64 == settings.reference_role_id)
    else {
        ctx.say("The reference role for custom roles is missing.").await?;
        return Ok(());
    };

    let member = guild_id.member(ctx.http(), ctx.author().id).await?;
    let allowed_ids = split_ids(&settings.allowed_roles);
    if !member.roles.iter().any(|id| allowed_ids.contains(&id.get())) {
        ctx.say("You are not allowed to create a custom role.").await?;
        return Ok(());
    }

    if role_name.chars().count() > MAX_ROLE_NAME_LEN {
        ctx.say("Please use a shorter role name. Restrict yourself to 14 symbols.")
            .await?;
        return Ok(());
    }
    let Some(color_value) = parse_hex_color(&color_code) else {
        ctx.say("Please enter a valid hex color code. Example: `#A47267`")
            .await?;
        return Ok(());
    };

    // Replace any previous custom role
    for owned in data.db.custom_roles(guild_id.get() as i64).await? {
        if owned.user_id == ctx.author().id.get() as i64 {
            clear_custom_role(
                ctx.serenity_context(),
                data,
                guild_id,
                owned.user_id,
                owned.role_id,
            )
            .await?;
        }
    }

    if guild_roles.iter().any(|role| role.name == role_name) {
        ctx.say("You can't use this role name. Try another one.").await?;
        return Ok(());
    }

    let custom_role = guild_id
        .create_role(
            ctx.http(),
            EditRole::new()
                .name(&role_name)
                .colour(serenity::Colour::new(color_value)),
        )
        .await?;

    if let Some(icon) = &role_icon {
        let guild = guild_id.to_partial_guild(ctx.http()).await?;
        if !guild
            .features
            .iter()
            .any(|feature| feature == "ROLE_ICONS")
        {
            ctx.say("This server doesn't have enough boosts to use custom role icons.")
                .await?;
            return Ok(());
        }
        let bytes = icon.download().await?;
        let attachment = serenity::CreateAttachment::bytes(bytes, icon.filename.clone());
        ctx.http()
            .edit_role(
                guild_id,
                custom_role.id,
                &serde_json::json!({ "icon": attachment.to_base64() }),
                Some("Custom role icon"),
            )
            .await?;
    }

    let new_position = reference_role.position.saturating_sub(1);
    if let Err(e) = guild_id
        .edit_role_position(ctx.http(), custom_role.id, new_position)
        .await
    {
        debug!("Could not reposition custom role: {e}");
    }

    member.add_role(ctx.http(), custom_role.id).await?;
    data.db
        .set_custom_role(
            guild_id.get() as i64,
            ctx.author().id.get() as i64,
            custom_role.id.get() as i64,
            &role_name,
        )
        .await?;
    ctx.say(format!("Created your custom role: {}", custom_role.mention()))
        .await?;
    Ok(())
}

/// Remove a custom role from yourself.
#[poise::command(slash_command, guild_only)]
pub async fn delete_custom_role(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();

    for owned in data.db.custom_roles(guild_id.get() as i64).await? {
        if owned.user_id == ctx.author().id.get() as i64 {
            clear_custom_role(
                ctx.serenity_context(),
                data,
                guild_id,
                owned.user_id,
                owned.role_id,
            )
            .await?;
            ctx.say("Deleted your custom role.").await?;
            return Ok(());
        }
    }
    ctx.say("You don't seem to have a custom role.").await?;
    Ok(())
}

/// Set up custom role settings.
#[poise::command(
    slash_command,
    guild_only,
    rename = "_create_custom_role_settings",
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn create_custom_role_settings(
    ctx: Context<'_>,
    #[description = "Custom roles are placed directly under this role."]
    reference_role: serenity::Role,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let menu_id = format!("custom_role_allowed_{}", ctx.id());
    let menu = CreateSelectMenu::new(
        menu_id.clone(),
        CreateSelectMenuKind::Role {
            default_roles: None,
        },
    )
    .min_values(1)
    .max_values(10);

    ctx.send(
        poise::CreateReply::default()
            .content("Select the roles that are allowed to create custom roles.")
            .components(vec![CreateActionRow::SelectMenu(menu)])
            .ephemeral(true),
    )
    .await?;

    let Some(interaction) = serenity::ComponentInteractionCollector::new(ctx.serenity_context())
        .author_id(ctx.author().id)
        .filter(move |interaction| interaction.data.custom_id == menu_id)
        .timeout(Duration::from_secs(120))
        .await
    else {
        return Ok(());
    };

    let ComponentInteractionDataKind::RoleSelect { values } = &interaction.data.kind else {
        return Ok(());
    };
    let allowed: Vec<u64> = values.iter().map(|id| id.get()).collect();

    ctx.data()
        .db
        .set_custom_role_settings(
            guild_id.get() as i64,
            &join_ids(&allowed),
            reference_role.id.get() as i64,
            &reference_role.name,
        )
        .await?;

    let mentions: Vec<String> = values.iter().map(|id| id.mention().to_string()).collect();
    interaction
        .create_response(
            ctx.http(),
            CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().content(
                format!(
                    "Set up custom roles.\nRoles allowed: {}\nReference role: {}",
                    mentions.join(", "),
                    reference_role.mention()
                ),
            )),
        )
        .await?;
    Ok(())
}

/// 200-minute sweep: strip custom roles whose owner left or lost
/// eligibility, and drop records whose role vanished.
pub async fn strip_stale_roles(ctx: &serenity::Context, data: &Data) -> Result<(), Error> {
    for guild_id in ctx.cache.guilds() {
        let Some(settings) = data.db.custom_role_settings(guild_id.get() as i64).await? else {
            continue;
        };
        let allowed_ids = split_ids(&settings.allowed_roles);
        let guild_roles = ctx.http.get_guild_roles(guild_id).await.unwrap_or_default();

        for owned in data.db.custom_roles(guild_id.get() as i64).await? {
            let member = guild_id
                .member(&ctx.http, serenity::UserId::new(owned.user_id as u64))
                .await;
            let Ok(member) = member else {
                clear_custom_role(ctx, data, guild_id, owned.user_id, owned.role_id).await?;
                info!("Removed custom role of departed user {}", owned.user_id);
                continue;
            };

            if !member.roles.iter().any(|id| allowed_ids.contains(&id.get())) {
                clear_custom_role(ctx, data, guild_id, owned.user_id, owned.role_id).await?;
                info!("Removed custom role of ineligible user {}", owned.user_id);
                continue;
            }

            if !guild_roles
                .iter()
                .any(|role| role.id.get() as i64 == owned.role_id)
            {
                clear_custom_role(ctx, data, guild_id, owned.user_id, owned.role_id).await?;
                info!("Dropped record of vanished custom role {}", owned.role_id);
            }
        }
    }
    Ok(())
}
