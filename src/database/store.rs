//! Sqlite-backed implementation of the engine's external interfaces.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use crate::database::connection::{get_connection, DbPool};
use crate::domain::faction::Faction;
use crate::domain::game::Game;
use crate::domain::game_type::GameType;
use crate::domain::known_players::UserId;
use crate::sources::{GameSource, IdentityHints, RatingRow, RatingSink};

/// Games before ranked-match start never rate.
const LADDER_CUTOFF_TIMESTAMP: i64 = 1_640_995_200; // 2022-01-01 UTC

#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> SqliteStore {
        SqliteStore { pool }
    }

    pub fn reset_schema(&self) -> Result<()> {
        let conn = get_connection(&self.pool)?;
        conn.execute_batch(include_str!("schema.sql"))
            .context("Failed to apply database schema")?;
        log::info!("Database schema applied.");
        Ok(())
    }

    pub fn user_exists(&self, user_id: UserId) -> Result<bool> {
        let conn = get_connection(&self.pool)?;
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM users WHERE id = ?1", params![user_id], |row| row.get(0))
            .optional()
            .context("Failed to look up user")?;
        Ok(found.is_some())
    }
}

impl GameSource for SqliteStore {
    fn fetch_games(&self, ladder: &str) -> Result<Vec<Game>> {
        let conn = get_connection(&self.pool)?;

        let mut statement = conn
            .prepare(
                "SELECT g.id, g.game_type, g.map, g.timestamp, g.duration, g.fps, g.is_draw, \
                        p.user_id, p.name, p.faction, p.won, p.points \
                 FROM games g \
                 JOIN game_players p ON p.game_id = g.id \
                 WHERE g.ladder = ?1 AND g.timestamp >= ?2 \
                 ORDER BY g.id, p.seat",
            )
            .context("Failed to prepare game query")?;

        let mut games: BTreeMap<u32, Game> = BTreeMap::new();

        let mut rows = statement
            .query(params![ladder, LADDER_CUTOFF_TIMESTAMP])
            .context("Failed to query games")?;

        while let Some(row) = rows.next()? {
            let game_id: u32 = row.get(0)?;

            let game = games.entry(game_id).or_insert_with(|| {
                let game_type: String = row.get(1).unwrap_or_default();
                let map: String = row.get(2).unwrap_or_default();
                let timestamp: i64 = row.get(3).unwrap_or_default();
                let duration: u32 = row.get(4).unwrap_or_default();
                let fps: u32 = row.get(5).unwrap_or_default();
                let is_draw: bool = row.get(6).unwrap_or_default();

                let mut game = Game::new(game_id, &map, timestamp, fps, duration);
                game.game_type =
                    GameType::from_short_name(&game_type).unwrap_or(GameType::Quickmatch);
                game.ladder = ladder.to_string();
                game.is_draw = is_draw;
                game
            });

            let user_id: UserId = row.get(7)?;
            let name: String = row.get(8)?;
            let faction_name: String = row.get(9)?;
            let won: bool = row.get(10)?;
            let points: i32 = row.get(11)?;

            let Some(faction) = Faction::from_short_name(&faction_name)
                .or_else(|| Faction::from_country(&faction_name))
            else {
                log::warn!(
                    "Cannot determine faction from '{faction_name}'. Game {game_id} will probably be invalid."
                );
                continue;
            };

            game.add_participant(user_id, &name, faction, won, points);
        }

        log::info!("Fetched {} games for ladder '{}'.", games.len(), ladder);
        Ok(games.into_values().collect())
    }
}

impl IdentityHints for SqliteStore {
    fn hints(&self, user_id: UserId) -> Result<BTreeSet<UserId>> {
        let conn = get_connection(&self.pool)?;

        let ip_address_id: Option<i64> = conn
            .query_row(
                "SELECT ip_address_id FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up ip address")?
            .flatten();

        let Some(ip_address_id) = ip_address_id else {
            return Ok(BTreeSet::new());
        };

        let mut statement = conn.prepare(
            "SELECT user_id FROM ip_address_histories \
             WHERE ip_address_id = ?1 AND user_id != ?2",
        )?;
        let duplicates = statement
            .query_map(params![ip_address_id, user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<BTreeSet<UserId>>>()
            .context("Failed to collect duplicates")?;

        Ok(duplicates)
    }

    fn alias(&self, user_id: UserId) -> Result<Option<String>> {
        let conn = get_connection(&self.pool)?;
        let alias: Option<Option<String>> = conn
            .query_row("SELECT alias FROM users WHERE id = ?1", params![user_id], |row| {
                row.get(0)
            })
            .optional()
            .context("Failed to look up alias")?;
        Ok(alias.flatten().filter(|a| !a.is_empty()))
    }

    fn account_name(&self, user_id: UserId) -> Result<Option<String>> {
        let conn = get_connection(&self.pool)?;
        let name: Option<String> = conn
            .query_row("SELECT name FROM users WHERE id = ?1", params![user_id], |row| {
                row.get(0)
            })
            .optional()
            .context("Failed to look up account name")?;
        Ok(name)
    }

    fn primary_mapping(&self, user_ids: &[UserId]) -> Result<BTreeMap<UserId, UserId>> {
        let conn = get_connection(&self.pool)?;
        let mut statement =
            conn.prepare("SELECT primary_user_id FROM users WHERE id = ?1")?;

        let mut mapping = BTreeMap::new();
        for &user_id in user_ids {
            let primary: Option<Option<UserId>> = statement
                .query_row(params![user_id], |row| row.get(0))
                .optional()
                .context("Failed to look up primary user")?;
            if let Some(Some(primary)) = primary {
                mapping.insert(user_id, primary);
            }
        }
        Ok(mapping)
    }
}

impl RatingSink for SqliteStore {
    /// Replace the ladder's rating table in one transaction; a failed
    /// insert rolls everything back.
    fn write_ratings(&mut self, ladder: &str, rows: &[RatingRow]) -> Result<()> {
        let mut conn = get_connection(&self.pool)?;
        let transaction = conn.transaction().context("Failed to open transaction")?;

        transaction
            .execute("DELETE FROM user_ratings WHERE ladder = ?1", params![ladder])
            .context("Failed to clear previous ratings")?;

        {
            let mut statement = transaction.prepare(
                "INSERT INTO user_ratings \
                 (user_id, ladder, elo, deviation, active_rank, alltime_rank, rated_games, is_active) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;

            for row in rows {
                statement
                    .execute(params![
                        row.user_id,
                        row.ladder,
                        row.elo,
                        row.deviation,
                        row.active_rank,
                        row.alltime_rank,
                        row.rated_games,
                        row.is_active,
                    ])
                    .with_context(|| format!("Failed to insert rating for user {}", row.user_id))?;
            }
        }

        transaction.commit().context("Failed to commit ratings")?;
        log::info!("Wrote {} rating rows for ladder '{}'.", rows.len(), ladder);
        Ok(())
    }
}
