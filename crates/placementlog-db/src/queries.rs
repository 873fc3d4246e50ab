use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use placementlog_types::models::{BranchCount, PlacementEvent, Post};

use crate::Database;
use crate::error::StoreResult;
use crate::models::{AdminRow, NewPlacement, NewUser, TotalRow, UserRow};
use crate::store::{CredentialStore, PlacementStore, PostStore};

const USER_COLUMNS: &str = "id, registration_number, display_name, password, created_at";
const ADMIN_COLUMNS: &str = "id, username, password, created_at";
const POST_COLUMNS: &str = "id, user_id, post_body, reviewed, created_at";

// -- Credentials --

impl CredentialStore for Database {
    fn insert_user(&self, user: &NewUser<'_>) -> StoreResult<UserRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO users (id, registration_number, display_name, password)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING {USER_COLUMNS}"
                ),
                params![
                    user.id,
                    user.registration_number,
                    user.display_name,
                    user.password_hash
                ],
                map_user,
            )?;
            Ok(row)
        })
    }

    fn find_user_by_registration_number(
        &self,
        registration_number: &str,
    ) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE registration_number = ?1"),
                    [registration_number],
                    map_user,
                )
                .optional()?;
            Ok(row)
        })
    }

    fn insert_admin(&self, id: &str, username: &str, password_hash: &str) -> StoreResult<AdminRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO admins (id, username, password) VALUES (?1, ?2, ?3)
                     RETURNING {ADMIN_COLUMNS}"
                ),
                params![id, username, password_hash],
                map_admin,
            )?;
            Ok(row)
        })
    }

    fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<AdminRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE username = ?1"),
                    [username],
                    map_admin,
                )
                .optional()?;
            Ok(row)
        })
    }
}

// -- Posts --

impl PostStore for Database {
    fn insert_post(&self, id: &str, user_id: &str, body: &serde_json::Value) -> StoreResult<Post> {
        self.with_conn(|conn| {
            let post = conn.query_row(
                &format!(
                    "INSERT INTO posts (id, user_id, post_body, reviewed) VALUES (?1, ?2, ?3, 0)
                     RETURNING {POST_COLUMNS}"
                ),
                params![id, user_id, body],
                map_post,
            )?;
            Ok(post)
        })
    }

    fn update_post_body(
        &self,
        id: &str,
        user_id: &str,
        body: &serde_json::Value,
    ) -> StoreResult<Option<Post>> {
        // Ownership lives in the WHERE clause so a foreign post and a missing
        // one look the same to the caller.
        self.with_conn(|conn| {
            let post = conn
                .query_row(
                    &format!(
                        "UPDATE posts SET post_body = ?1, reviewed = 0
                         WHERE id = ?2 AND user_id = ?3
                         RETURNING {POST_COLUMNS}"
                    ),
                    params![body, id, user_id],
                    map_post,
                )
                .optional()?;
            Ok(post)
        })
    }

    fn set_reviewed(&self, id: &str, reviewed: bool) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE posts SET reviewed = ?1 WHERE id = ?2",
                params![reviewed, id],
            )?;
            Ok(affected > 0)
        })
    }

    fn delete_post(&self, id: &str, user_id: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM posts WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?;
            Ok(affected > 0)
        })
    }

    fn delete_post_unchecked(&self, id: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(affected > 0)
        })
    }

    fn approved_posts(&self) -> StoreResult<Vec<Post>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE reviewed = 1
                     ORDER BY created_at DESC, rowid DESC"
                ),
                [],
            )
        })
    }

    fn approved_posts_by_user(&self, user_id: &str) -> StoreResult<Vec<Post>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE user_id = ?1 AND reviewed = 1
                     ORDER BY created_at DESC, rowid DESC"
                ),
                [user_id],
            )
        })
    }

    fn all_posts(&self) -> StoreResult<Vec<Post>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!("SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, rowid DESC"),
                [],
            )
        })
    }
}

// -- Placements --

impl PlacementStore for Database {
    fn insert_placement(&self, placement: &NewPlacement) -> StoreResult<PlacementEvent> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let (id, created_at): (i64, DateTime<Utc>) = tx.query_row(
                "INSERT INTO placement_companies (company, ctc, placement_date) VALUES (?1, ?2, ?3)
                 RETURNING id, created_at",
                params![placement.company, placement.ctc, placement.placement_date],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO placement_branch_counts (placement_id, branch, count)
                     VALUES (?1, ?2, ?3)",
                )?;
                for bc in &placement.branch_counts {
                    stmt.execute(params![id, bc.branch, bc.count])?;
                }
            }

            // Dropping `tx` without commit rolls the event back too.
            tx.commit()?;

            Ok(PlacementEvent {
                id,
                company: placement.company.clone(),
                ctc: placement.ctc,
                placement_date: placement.placement_date,
                created_at,
                branch_counts: placement.branch_counts.clone(),
            })
        })
    }

    fn placements(&self) -> StoreResult<Vec<PlacementEvent>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, company, ctc, placement_date, created_at
                 FROM placement_companies
                 ORDER BY placement_date DESC, id DESC",
            )?;

            let mut events = stmt
                .query_map([], |row| {
                    Ok(PlacementEvent {
                        id: row.get(0)?,
                        company: row.get(1)?,
                        ctc: row.get(2)?,
                        placement_date: row.get(3)?,
                        created_at: row.get(4)?,
                        branch_counts: Vec::new(),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            // One query per event; placement lists stay small.
            let mut counts = conn.prepare(
                "SELECT branch, count FROM placement_branch_counts
                 WHERE placement_id = ?1
                 ORDER BY branch",
            )?;
            for event in &mut events {
                event.branch_counts = counts
                    .query_map([event.id], |row| {
                        Ok(BranchCount {
                            branch: row.get(0)?,
                            count: row.get(1)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
            }

            Ok(events)
        })
    }

    fn company_branch_totals(&self) -> StoreResult<Vec<TotalRow>> {
        self.with_conn(|conn| {
            query_totals(
                conn,
                "SELECT p.company, b.branch, SUM(b.count)
                 FROM placement_branch_counts b
                 JOIN placement_companies p ON p.id = b.placement_id
                 GROUP BY p.company, b.branch
                 ORDER BY p.company, b.branch",
            )
        })
    }

    fn branch_company_totals(&self) -> StoreResult<Vec<TotalRow>> {
        self.with_conn(|conn| {
            query_totals(
                conn,
                "SELECT p.company, b.branch, SUM(b.count)
                 FROM placement_branch_counts b
                 JOIN placement_companies p ON p.id = b.placement_id
                 GROUP BY b.branch, p.company
                 ORDER BY b.branch, p.company",
            )
        })
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        registration_number: row.get(1)?,
        display_name: row.get(2)?,
        password: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_admin(row: &Row<'_>) -> rusqlite::Result<AdminRow> {
    Ok(AdminRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        post_body: row.get(2)?,
        reviewed: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_posts<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> StoreResult<Vec<Post>> {
    let mut stmt = conn.prepare(sql)?;
    let posts = stmt
        .query_map(params, map_post)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

fn query_totals(conn: &Connection, sql: &str) -> StoreResult<Vec<TotalRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(TotalRow {
                company: row.get(0)?,
                branch: row.get(1)?,
                total: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
