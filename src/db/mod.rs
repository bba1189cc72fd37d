// Database access layer (SQLite via sqlx).
//
// The store is deliberately plain: one row per team profile, one per
// question, one per creature, and a singleton game-switch row. All game
// rules live in the engine; this layer only loads and saves rows.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::engine::{CreatureInfo, Progress, QuestionInfo, TeamState};

/// Starting wallet balance for a freshly registered team.
pub const STARTING_POKEMONEY: i64 = 3000;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: i64,
    pub teamname: String,
    pub password_hash: String,
    pub name1: String,
    pub name2: String,
    pub phone1: String,
    pub phone2: String,
    pub email1: String,
    pub email2: String,
    pub idno1: String,
    pub idno2: String,
    pub creature: Option<String>,
    pub chosen: i64,
    pub submitted: i64,
    pub fainted: i64,
    pub attempted_questions: String,
    pub correct_questions: String,
    pub xp: i64,
    pub pokemoney: i64,
    pub evolution: i64,
    pub role: String,
    pub is_active: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Creature {
    pub name: String,
    pub poke_type: i64,
    pub question_number: i64,
    pub stage: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    pub number: i64,
    pub difficulty_level: i64,
    pub content: String,
    pub answer: String,
}

impl Team {
    /// Build the engine's in-memory state from this row. The creature row,
    /// when bound, comes from a separate lookup by name.
    pub fn to_state(
        &self,
        creature: Option<&Creature>,
        question_count: usize,
    ) -> Result<TeamState, serde_json::Error> {
        Ok(TeamState {
            teamname: self.teamname.clone(),
            creature: creature.map(Creature::info),
            chosen: self.chosen == 1,
            submitted: self.submitted == 1,
            fainted: self.fainted == 1,
            xp: self.xp,
            pokemoney: self.pokemoney,
            evolution: self.evolution as u8,
            progress: Progress::from_columns(
                &self.attempted_questions,
                &self.correct_questions,
                question_count,
            )?,
        })
    }
}

impl Creature {
    pub fn info(&self) -> CreatureInfo {
        CreatureInfo {
            name: self.name.clone(),
            poke_type: self.poke_type as u8,
            question_number: self.question_number,
            stage: self.stage as u8,
        }
    }
}

impl Question {
    pub fn info(&self) -> QuestionInfo {
        QuestionInfo {
            number: self.number,
            difficulty_level: self.difficulty_level,
            content: self.content.clone(),
            answer: self.answer.clone(),
        }
    }
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        db.seed_species().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                teamname TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                name1 TEXT NOT NULL DEFAULT '',
                name2 TEXT NOT NULL DEFAULT '',
                phone1 TEXT NOT NULL DEFAULT '',
                phone2 TEXT NOT NULL DEFAULT '',
                email1 TEXT NOT NULL DEFAULT '',
                email2 TEXT NOT NULL DEFAULT '',
                idno1 TEXT NOT NULL DEFAULT '',
                idno2 TEXT NOT NULL DEFAULT '',
                creature TEXT,
                chosen INTEGER NOT NULL DEFAULT 0,
                submitted INTEGER NOT NULL DEFAULT 0,
                fainted INTEGER NOT NULL DEFAULT 0,
                attempted_questions TEXT NOT NULL DEFAULT '[]',
                correct_questions TEXT NOT NULL DEFAULT '[]',
                xp INTEGER NOT NULL DEFAULT 0,
                pokemoney INTEGER NOT NULL DEFAULT 3000,
                evolution INTEGER NOT NULL DEFAULT 1,
                role TEXT NOT NULL DEFAULT 'team',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS creatures (
                name TEXT PRIMARY KEY,
                poke_type INTEGER NOT NULL,
                question_number INTEGER NOT NULL UNIQUE,
                stage INTEGER NOT NULL DEFAULT 1
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                number INTEGER PRIMARY KEY,
                difficulty_level INTEGER NOT NULL DEFAULT 1,
                content TEXT NOT NULL,
                answer TEXT NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS game_switch (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                open INTEGER NOT NULL DEFAULT 0
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT OR IGNORE INTO game_switch (id, open) VALUES (1, 0)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Seed the twelve canonical species. Question numbers place each
    /// species in its family of ten (1, 11, 21 share display id 1, and so
    /// on), so the base species double as the opponents of questions 1-4.
    async fn seed_species(&self) -> Result<(), sqlx::Error> {
        let species: [(&str, i64, i64, i64); 12] = [
            ("Charmander", 1, 1, 1),
            ("Squirtle", 2, 2, 1),
            ("Bulbasaur", 3, 3, 1),
            ("Pichu", 4, 4, 1),
            ("Charmeleon", 1, 11, 2),
            ("Wartortle", 2, 12, 2),
            ("Ivysaur", 3, 13, 2),
            ("Pikachu", 4, 14, 2),
            ("Charizard", 1, 21, 3),
            ("Blastoise", 2, 22, 3),
            ("Venusaur", 3, 23, 3),
            ("Raichu", 4, 24, 3),
        ];
        for (name, poke_type, question_number, stage) in species {
            sqlx::query(
                "INSERT OR IGNORE INTO creatures (name, poke_type, question_number, stage) VALUES (?, ?, ?, ?)",
            )
            .bind(name)
            .bind(poke_type)
            .bind(question_number)
            .bind(stage)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    // ── Teams ─────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub async fn create_team(
        &self,
        teamname: &str,
        password_hash: &str,
        name1: &str,
        name2: &str,
        phone1: &str,
        phone2: &str,
        email1: &str,
        email2: &str,
        idno1: &str,
        idno2: &str,
        question_count: usize,
    ) -> Result<Team, sqlx::Error> {
        let (attempted, correct) = Progress::new(question_count).to_columns();
        let row = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams
                (teamname, password_hash, name1, name2, phone1, phone2,
                 email1, email2, idno1, idno2,
                 attempted_questions, correct_questions, pokemoney)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(teamname)
        .bind(password_hash)
        .bind(name1)
        .bind(name2)
        .bind(phone1)
        .bind(phone2)
        .bind(email1)
        .bind(email2)
        .bind(idno1)
        .bind(idno2)
        .bind(attempted)
        .bind(correct)
        .bind(STARTING_POKEMONEY)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Create the admin account if it does not exist yet.
    pub async fn ensure_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO teams (teamname, password_hash, role, pokemoney)
            VALUES (?, ?, 'admin', 0)
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_team(&self, id: i64) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_team_by_name(&self, teamname: &str) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE teamname = ?")
            .bind(teamname)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_teams(&self) -> Result<Vec<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE role = 'team' ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    /// Persist the mutable gameplay fields of an engine state back to the
    /// team's row.
    pub async fn save_state(&self, team_id: i64, state: &TeamState) -> Result<(), sqlx::Error> {
        let (attempted, correct) = state.progress.to_columns();
        sqlx::query(
            r#"
            UPDATE teams SET
                creature = ?, chosen = ?, submitted = ?, fainted = ?,
                attempted_questions = ?, correct_questions = ?,
                xp = ?, pokemoney = ?, evolution = ?
            WHERE id = ?
            "#,
        )
        .bind(state.creature.as_ref().map(|c| c.name.clone()))
        .bind(state.chosen as i64)
        .bind(state.submitted as i64)
        .bind(state.fainted as i64)
        .bind(attempted)
        .bind(correct)
        .bind(state.xp)
        .bind(state.pokemoney)
        .bind(state.evolution as i64)
        .bind(team_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Freeze every team profile: the external end-of-game action.
    pub async fn set_all_submitted(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE teams SET submitted = 1 WHERE role = 'team'")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ── Questions ─────────────────────────────────────────────────────

    pub async fn get_question(&self, number: i64) -> Result<Option<Question>, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            "SELECT number, difficulty_level, content, answer FROM questions WHERE number = ?",
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn create_question(
        &self,
        number: i64,
        difficulty_level: i64,
        content: &str,
        answer: &str,
    ) -> Result<Question, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (number, difficulty_level, content, answer)
            VALUES (?, ?, ?, ?)
            RETURNING number, difficulty_level, content, answer
            "#,
        )
        .bind(number)
        .bind(difficulty_level)
        .bind(content)
        .bind(answer)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn count_questions(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await
    }

    // ── Creatures ─────────────────────────────────────────────────────

    pub async fn get_creature(&self, name: &str) -> Result<Option<Creature>, sqlx::Error> {
        sqlx::query_as::<_, Creature>(
            "SELECT name, poke_type, question_number, stage FROM creatures WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_creature_by_question(
        &self,
        question_number: i64,
    ) -> Result<Option<Creature>, sqlx::Error> {
        sqlx::query_as::<_, Creature>(
            "SELECT name, poke_type, question_number, stage FROM creatures WHERE question_number = ?",
        )
        .bind(question_number)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn create_creature(
        &self,
        name: &str,
        poke_type: i64,
        question_number: i64,
        stage: i64,
    ) -> Result<Creature, sqlx::Error> {
        sqlx::query_as::<_, Creature>(
            r#"
            INSERT INTO creatures (name, poke_type, question_number, stage)
            VALUES (?, ?, ?, ?)
            RETURNING name, poke_type, question_number, stage
            "#,
        )
        .bind(name)
        .bind(poke_type)
        .bind(question_number)
        .bind(stage)
        .fetch_one(&self.pool)
        .await
    }

    // ── Game switch ───────────────────────────────────────────────────

    pub async fn game_open(&self) -> Result<bool, sqlx::Error> {
        let open: i64 = sqlx::query_scalar("SELECT open FROM game_switch WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(open == 1)
    }

    pub async fn set_game_open(&self, open: bool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE game_switch SET open = ? WHERE id = 1")
            .bind(open as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
