use anyhow::Context;
use chrono::NaiveDate;
use log::info;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::attendance::DailyAttendance;
use crate::error::RecapError;
use crate::models::{
    AttendanceEvent, ClassRoom, Gender, JournalEntry, NewJournalEntry, NewStudent, Profile,
    Student,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let teacher = upsert_profile(pool, "Rina Wulandari", "rina.wulandari@sekolah.sch.id").await?;

    let class_id = Uuid::parse_str("6f1c2a3e-5b7d-4c1e-9a2f-3d4e5f607182")?;
    sqlx::query(
        r#"
        INSERT INTO classroom.classes (id, user_id, name, level, phase, academic_year)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(class_id)
    .bind(teacher.id)
    .bind("Kelas 5A")
    .bind("SD")
    .bind("C")
    .bind("2025/2026")
    .execute(pool)
    .await?;

    let students = vec![
        (
            Uuid::parse_str("a1b2c3d4-0001-4e5f-8a9b-0c1d2e3f4a5b")?,
            "Ana Putri",
            Gender::Female,
        ),
        (
            Uuid::parse_str("a1b2c3d4-0002-4e5f-8a9b-0c1d2e3f4a5b")?,
            "Budi Santoso",
            Gender::Male,
        ),
        (
            Uuid::parse_str("a1b2c3d4-0003-4e5f-8a9b-0c1d2e3f4a5b")?,
            "Citra Lestari",
            Gender::Female,
        ),
    ];

    for (id, name, gender) in &students {
        sqlx::query(
            r#"
            INSERT INTO classroom.students (id, class_id, full_name, gender)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name
            "#,
        )
        .bind(id)
        .bind(class_id)
        .bind(name)
        .bind(gender.code())
        .execute(pool)
        .await?;
    }

    let days = [
        (NaiveDate::from_ymd_opt(2025, 9, 1).context("invalid date")?, ["H", "H", "S"]),
        (NaiveDate::from_ymd_opt(2025, 9, 2).context("invalid date")?, ["H", "I", "H"]),
        (NaiveDate::from_ymd_opt(2025, 9, 3).context("invalid date")?, ["A", "H", "H"]),
    ];

    for (date, codes) in days {
        for ((student_id, _, _), code) in students.iter().zip(codes) {
            upsert_attendance_row(pool, class_id, *student_id, date, code).await?;
        }
    }

    Ok(())
}

pub async fn upsert_profile(pool: &PgPool, full_name: &str, email: &str) -> anyhow::Result<Profile> {
    let row = sqlx::query(
        r#"
        INSERT INTO classroom.profiles (id, full_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET full_name = EXCLUDED.full_name
        RETURNING id, full_name, email
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .fetch_one(pool)
    .await?;

    Ok(Profile {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
    })
}

async fn profile_id_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Uuid> {
    let row = sqlx::query("SELECT id FROM classroom.profiles WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("no teacher profile for {email}"))?;
    Ok(row.get("id"))
}

fn class_from_row(row: &sqlx::postgres::PgRow) -> ClassRoom {
    ClassRoom {
        id: row.get("id"),
        name: row.get("name"),
        level: row.get("level"),
        phase: row.get("phase"),
        academic_year: row.get("academic_year"),
        created_at: row.get("created_at"),
    }
}

pub async fn create_class(
    pool: &PgPool,
    teacher_email: &str,
    name: &str,
    level: &str,
    phase: &str,
    academic_year: &str,
) -> anyhow::Result<ClassRoom> {
    let user_id = profile_id_by_email(pool, teacher_email).await?;
    let row = sqlx::query(
        r#"
        INSERT INTO classroom.classes (id, user_id, name, level, phase, academic_year)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, name, level, phase, academic_year, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(name)
    .bind(level)
    .bind(phase)
    .bind(academic_year)
    .fetch_one(pool)
    .await?;

    Ok(class_from_row(&row))
}

pub async fn list_classes(pool: &PgPool, teacher_email: &str) -> anyhow::Result<Vec<ClassRoom>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.name, c.level, c.phase, c.academic_year, c.created_at
        FROM classroom.classes c
        JOIN classroom.profiles p ON p.id = c.user_id
        WHERE p.email = $1
        ORDER BY c.created_at ASC
        "#,
    )
    .bind(teacher_email)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(class_from_row).collect())
}

pub async fn fetch_class(pool: &PgPool, class_id: Uuid) -> anyhow::Result<ClassRoom> {
    let row = sqlx::query(
        r#"
        SELECT id, name, level, phase, academic_year, created_at
        FROM classroom.classes
        WHERE id = $1
        "#,
    )
    .bind(class_id)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("class {class_id} not found"))?;

    Ok(class_from_row(&row))
}

async fn insert_student<'e, E>(executor: E, class_id: Uuid, student: &NewStudent) -> sqlx::Result<Uuid>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let row = sqlx::query(
        r#"
        INSERT INTO classroom.students
        (id, class_id, full_name, nisn, gender, parent_name, parent_phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(class_id)
    .bind(&student.full_name)
    .bind(&student.nisn)
    .bind(student.gender.code())
    .bind(&student.parent_name)
    .bind(&student.parent_phone)
    .fetch_one(executor)
    .await?;

    Ok(row.get("id"))
}

pub async fn add_student(pool: &PgPool, class_id: Uuid, student: &NewStudent) -> anyhow::Result<Uuid> {
    let id = insert_student(pool, class_id, student).await?;
    info!("added student {} ({id}) to class {class_id}", student.full_name);
    Ok(id)
}

/// Inserts all rows or none.
pub async fn insert_students(
    pool: &PgPool,
    class_id: Uuid,
    students: &[NewStudent],
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    for student in students {
        insert_student(&mut *tx, class_id, student)
            .await
            .with_context(|| format!("failed to insert {}", student.full_name))?;
    }
    tx.commit().await?;

    info!("imported {} students into class {class_id}", students.len());
    Ok(students.len())
}

/// Roster sorted by name, ascending.
pub async fn fetch_roster(pool: &PgPool, class_id: Uuid) -> Result<Vec<Student>, RecapError> {
    let rows = sqlx::query(
        r#"
        SELECT id, full_name, gender
        FROM classroom.students
        WHERE class_id = $1
        ORDER BY full_name ASC
        "#,
    )
    .bind(class_id)
    .fetch_all(pool)
    .await
    .map_err(|err| RecapError::upstream("roster", err))?;

    let students = rows
        .iter()
        .map(|row| {
            let gender: Option<String> = row.get("gender");
            Student::new(
                row.get("id"),
                row.get::<String, _>("full_name"),
                Gender::from_code(gender.as_deref()),
            )
        })
        .collect::<Vec<_>>();

    info!("fetched {} students for class {class_id}", students.len());
    Ok(students)
}

/// Attendance rows for `first..=last`.
pub async fn fetch_attendance(
    pool: &PgPool,
    class_id: Uuid,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<Vec<AttendanceEvent>, RecapError> {
    let rows = sqlx::query(
        r#"
        SELECT student_id, date, status
        FROM classroom.attendance
        WHERE class_id = $1 AND date >= $2 AND date <= $3
        ORDER BY date ASC, created_at ASC
        "#,
    )
    .bind(class_id)
    .bind(first)
    .bind(last)
    .fetch_all(pool)
    .await
    .map_err(|err| RecapError::upstream("attendance", err))?;

    let events = rows
        .iter()
        .map(|row| AttendanceEvent {
            student_id: row.get("student_id"),
            date: row.get("date"),
            status: row.get("status"),
        })
        .collect::<Vec<_>>();

    info!(
        "fetched {} attendance rows for class {class_id} between {first} and {last}",
        events.len()
    );
    Ok(events)
}

async fn upsert_attendance_row<'e, E>(
    executor: E,
    class_id: Uuid,
    student_id: Uuid,
    date: NaiveDate,
    status: &str,
) -> sqlx::Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO classroom.attendance (id, class_id, student_id, date, status)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (student_id, date) DO UPDATE
        SET status = EXCLUDED.status, class_id = EXCLUDED.class_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(class_id)
    .bind(student_id)
    .bind(date)
    .bind(status)
    .execute(executor)
    .await?;
    Ok(())
}

/// Upserts on `(student_id, date)`. Lines without a status are skipped.
pub async fn save_attendance(
    pool: &PgPool,
    class_id: Uuid,
    date: NaiveDate,
    sheet: &[DailyAttendance],
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    let mut saved = 0usize;

    for line in sheet {
        let Some(status) = line.status else {
            continue;
        };
        upsert_attendance_row(&mut *tx, class_id, line.student_id, date, status.code()).await?;
        saved += 1;
    }
    tx.commit().await?;

    info!("saved {saved} attendance rows for class {class_id} on {date}");
    Ok(saved)
}

pub async fn add_journal(
    pool: &PgPool,
    class_id: Uuid,
    entry: &NewJournalEntry,
) -> anyhow::Result<Uuid> {
    let row = sqlx::query(
        r#"
        INSERT INTO classroom.journals
        (id, class_id, date, lesson_period, subject, material, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(class_id)
    .bind(entry.date)
    .bind(&entry.lesson_period)
    .bind(&entry.subject)
    .bind(&entry.material)
    .bind(&entry.notes)
    .fetch_one(pool)
    .await?;

    Ok(row.get("id"))
}

/// Newest first.
pub async fn list_journals(pool: &PgPool, class_id: Uuid) -> anyhow::Result<Vec<JournalEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, date, lesson_period, subject, material, notes
        FROM classroom.journals
        WHERE class_id = $1
        ORDER BY date DESC, created_at DESC
        "#,
    )
    .bind(class_id)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(JournalEntry {
            id: row.get("id"),
            date: row.get("date"),
            lesson_period: row.get("lesson_period"),
            subject: row.get("subject"),
            material: row.get("material"),
            notes: row.get("notes"),
        });
    }

    Ok(entries)
}

pub async fn delete_journal(pool: &PgPool, journal_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM classroom.journals WHERE id = $1")
        .bind(journal_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
