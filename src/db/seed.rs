// Sample data for fresh databases
use chrono::{Duration, Utc};
use rusqlite::{params, Connection};

use crate::auth::password;
use crate::db::models::Role;
use crate::repository::{immediate, RepositoryError};
use crate::state::DbPool;

pub const ADMIN_EMAIL: &str = "admin@casira.org";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const DONOR_EMAIL: &str = "donante@ejemplo.com";
pub const DONOR_PASSWORD: &str = "donante123";

struct SampleUser {
    email: &'static str,
    password: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    role: Role,
    bio: &'static str,
}

const USERS: &[SampleUser] = &[
    SampleUser {
        email: ADMIN_EMAIL,
        password: ADMIN_PASSWORD,
        first_name: "Administrador",
        last_name: "CASIRA",
        role: Role::Admin,
        bio: "Administrador principal de la plataforma CASIRA Connect",
    },
    SampleUser {
        email: DONOR_EMAIL,
        password: DONOR_PASSWORD,
        first_name: "María",
        last_name: "González",
        role: Role::Donor,
        bio: "Empresaria comprometida con la educación en Guatemala",
    },
];

// (title, description, status, budget, beneficiaries, progress, location, featured)
const PROJECTS: &[(&str, &str, &str, i64, i64, i64, &str, bool)] = &[
    (
        "Nueva Biblioteca en San Juan",
        "Gracias a nuestros donantes, 300 niños ahora tienen acceso a libros y tecnología",
        "completed",
        45_000,
        300,
        100,
        "San Juan Palencia, Guatemala",
        true,
    ),
    (
        "Laboratorio de Ciencias Renovado",
        "El Liceo San Francisco ahora cuenta con equipamiento moderno para experimentos",
        "active",
        30_000,
        450,
        85,
        "Liceo San Francisco de Asís",
        true,
    ),
    (
        "Centro Comunitario Construido",
        "Un espacio de encuentro que fortalece los lazos de toda la comunidad",
        "active",
        60_000,
        1_200,
        60,
        "Palencia, Guatemala",
        false,
    ),
];

const POSTS: &[&str] = &[
    "¡Increíble progreso en la biblioteca! Los niños ya están usando los nuevos libros y \
     computadoras. Gracias a todos los constructores de sueños que hicieron esto posible.",
    "El laboratorio de ciencias está tomando forma. Los estudiantes podrán realizar \
     experimentos que antes solo veían en libros. ¡La educación está transformándose!",
];

/// Seed users, projects, posts and one volunteer activity. No-op unless the
/// users table is empty. Returns whether anything was inserted.
pub async fn seed_sample_data(pool: &DbPool, bcrypt_cost: u32) -> anyhow::Result<bool> {
    if !users_empty(pool)? {
        tracing::debug!("Users present, skipping sample data");
        return Ok(false);
    }

    let mut hashes = Vec::with_capacity(USERS.len());
    for user in USERS {
        let credential =
            password::hash_password_blocking(user.password.to_string(), bcrypt_cost).await?;
        hashes.push(credential);
    }

    let conn = pool.get()?;
    let inserted = immediate(&conn, |conn| {
        // Re-check under the write lock in case another process seeded first
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(false);
        }
        insert_samples(conn, &hashes)?;
        Ok(true)
    })?;

    if inserted {
        tracing::info!(
            users = USERS.len(),
            projects = PROJECTS.len(),
            posts = POSTS.len(),
            "Seeded sample data"
        );
    }
    Ok(inserted)
}

fn users_empty(pool: &DbPool) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count == 0)
}

fn insert_samples(
    conn: &Connection,
    hashes: &[password::Credential],
) -> Result<(), RepositoryError> {
    let now = Utc::now();
    let mut user_ids = Vec::with_capacity(USERS.len());

    for (user, credential) in USERS.iter().zip(hashes) {
        conn.execute(
            "INSERT INTO users (email, first_name, last_name, role, bio, password_hash,
                                password_algorithm, auth_provider, email_verified, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'casira', 1, ?8)",
            params![
                user.email,
                user.first_name,
                user.last_name,
                user.role,
                user.bio,
                credential.hash,
                credential.algorithm.as_str(),
                now.to_rfc3339(),
            ],
        )?;
        user_ids.push(conn.last_insert_rowid());
    }

    for (title, description, status, budget, beneficiaries, progress, location, featured) in
        PROJECTS
    {
        conn.execute(
            "INSERT INTO projects (title, description, status, budget, beneficiaries_count,
                                   progress_percentage, location, featured, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                title,
                description,
                status,
                budget,
                beneficiaries,
                progress,
                location,
                featured,
                now.to_rfc3339()
            ],
        )?;
    }

    let (admin, donor) = (user_ids[0], user_ids[1]);
    let admin_name = format!("{} {}", USERS[0].first_name, USERS[0].last_name);
    let donor_name = format!("{} {}", USERS[1].first_name, USERS[1].last_name);

    for (i, content) in POSTS.iter().enumerate() {
        let created = now - Duration::days((POSTS.len() - i) as i64);
        conn.execute(
            "INSERT INTO posts (author_id, author, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![admin, admin_name, content, created.to_rfc3339()],
        )?;
    }

    // The first post gets one comment and one like from the donor
    let first_post: i64 = conn.query_row("SELECT MIN(id) FROM posts", [], |row| row.get(0))?;
    conn.execute(
        "INSERT INTO comments (post_id, author_id, author, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            first_post,
            donor,
            donor_name,
            "¡Qué alegría ver a los niños disfrutando la biblioteca!",
            now.to_rfc3339()
        ],
    )?;
    conn.execute(
        "INSERT INTO likes (subject_type, subject_id, user_id, created_at)
         VALUES ('post', ?1, ?2, ?3)",
        params![first_post, donor, now.to_rfc3339()],
    )?;
    conn.execute(
        "UPDATE posts SET
           likes_count = (SELECT COUNT(*) FROM likes
                          WHERE subject_type = 'post' AND subject_id = posts.id),
           comments_count = (SELECT COUNT(*) FROM comments WHERE post_id = posts.id)",
        [],
    )?;

    conn.execute(
        "INSERT INTO volunteer_activities
           (title, description, location, created_by, start_date, end_date,
            max_volunteers, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            "Jornada de lectura comunitaria",
            "Acompaña a los niños de San Juan en una tarde de lectura en la nueva biblioteca",
            "San Juan Palencia, Guatemala",
            admin,
            (now + Duration::days(14)).format("%Y-%m-%d").to_string(),
            (now + Duration::days(14)).format("%Y-%m-%d").to_string(),
            20,
            now.to_rfc3339(),
        ],
    )?;

    Ok(())
}
