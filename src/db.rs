use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::ledger::{GradeBook, SchoolSnapshot};
use crate::models::{
    AcademicYearConfig, GradeEntry, Id, KnowledgeArea, Periodicity, SchoolClass, Student,
    StudentStatus, SubArea, Subject,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn periodicity_from_db(raw: &str) -> Periodicity {
    match raw {
        "semester" => Periodicity::Semester,
        _ => Periodicity::Annual,
    }
}

fn status_from_db(raw: &str) -> StudentStatus {
    match raw {
        "transferred" => StudentStatus::Transferred,
        "dropped" => StudentStatus::Dropped,
        _ => StudentStatus::Active,
    }
}

fn status_to_db(status: StudentStatus) -> &'static str {
    match status {
        StudentStatus::Active => "active",
        StudentStatus::Transferred => "transferred",
        StudentStatus::Dropped => "dropped",
    }
}

fn date(year: i32, month: u32, day: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).context("invalid date")
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    const YEAR: i32 = 2026;

    let areas = vec![
        ("Ciências da Natureza e Matemática", "fgb"),
        ("Linguagens e Ciências Humanas", "fgb"),
        ("Itinerário Formativo", "ifp"),
    ];
    let mut area_ids: BTreeMap<&str, Uuid> = BTreeMap::new();
    for (name, formation) in areas {
        let id: Uuid = sqlx::query(
            r#"
            INSERT INTO academic_records.knowledge_areas (id, name, formation_type_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET formation_type_id = EXCLUDED.formation_type_id
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(formation)
        .fetch_one(pool)
        .await?
        .get("id");
        area_ids.insert(name, id);
    }

    let sub_areas = vec![
        ("Matemática", "Ciências da Natureza e Matemática"),
        ("Ciências da Natureza", "Ciências da Natureza e Matemática"),
        ("Linguagens", "Linguagens e Ciências Humanas"),
        ("Ciências Humanas", "Linguagens e Ciências Humanas"),
        ("Aprofundamento", "Itinerário Formativo"),
    ];
    let mut sub_area_ids: BTreeMap<&str, Uuid> = BTreeMap::new();
    for (name, area) in sub_areas {
        let area_id = area_ids.get(area).copied().context("seed area missing")?;
        let id: Uuid = sqlx::query(
            r#"
            INSERT INTO academic_records.sub_areas (id, name, knowledge_area_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (name, knowledge_area_id) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(area_id)
        .fetch_one(pool)
        .await?
        .get("id");
        sub_area_ids.insert(name, id);
    }

    let subjects = vec![
        ("MATEMÁTICA", "annual", Some("Matemática")),
        ("FÍSICA", "annual", Some("Ciências da Natureza")),
        ("QUÍMICA", "annual", Some("Ciências da Natureza")),
        ("BIOLOGIA", "annual", Some("Ciências da Natureza")),
        ("LÍNGUA PORTUGUESA", "annual", Some("Linguagens")),
        ("INGLÊS", "annual", Some("Linguagens")),
        ("HISTÓRIA", "annual", Some("Ciências Humanas")),
        ("GEOGRAFIA", "annual", Some("Ciências Humanas")),
        ("ELETIVA DE ROBÓTICA", "semester", Some("Aprofundamento")),
        ("PROJETO DE VIDA", "annual", None),
    ];
    let mut subject_ids = Vec::new();
    for (name, periodicity, sub_area) in subjects {
        let sub_area_id = sub_area.and_then(|s| sub_area_ids.get(s).copied());
        let id: Uuid = sqlx::query(
            r#"
            INSERT INTO academic_records.subjects (id, name, year, periodicity, sub_area_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name, year) DO UPDATE
            SET periodicity = EXCLUDED.periodicity, sub_area_id = EXCLUDED.sub_area_id
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(YEAR)
        .bind(periodicity)
        .bind(sub_area_id)
        .fetch_one(pool)
        .await?
        .get("id");
        subject_ids.push(id);
    }

    let class_id: Uuid = sqlx::query(
        r#"
        INSERT INTO academic_records.classes (id, name, year)
        VALUES ($1, $2, $3)
        ON CONFLICT (name, year) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind("1º A")
    .bind(YEAR)
    .fetch_one(pool)
    .await?
    .get("id");

    for subject_id in &subject_ids {
        sqlx::query(
            r#"
            INSERT INTO academic_records.class_subjects (class_id, subject_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(class_id)
        .bind(subject_id)
        .execute(pool)
        .await?;
    }

    let students = vec![
        ("Ana Beatriz Souza", "2026001", StudentStatus::Active, [7.5, 8.0, 6.5, 7.0], None),
        ("Bruno Carvalho", "2026002", StudentStatus::Active, [7.0, 5.0, 6.0, 4.0], Some(7.0)),
        ("Carla Mendes", "2026003", StudentStatus::Active, [4.0, 5.0, 3.0, 4.0], None),
        ("Diego Ramos", "2026004", StudentStatus::Transferred, [6.0, 6.5, 0.0, 0.0], None),
        ("Elisa Fontes", "2026005", StudentStatus::Active, [2.0, 3.0, 2.5, 3.5], Some(9.0)),
    ];

    for (name, registration, status, bimesters, recovery) in students {
        let student_id: Uuid = sqlx::query(
            r#"
            INSERT INTO academic_records.students
            (id, full_name, registration_number, class_id, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (registration_number) DO UPDATE
            SET full_name = EXCLUDED.full_name, class_id = EXCLUDED.class_id,
                status = EXCLUDED.status
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(registration)
        .bind(class_id)
        .bind(status_to_db(status))
        .fetch_one(pool)
        .await?
        .get("id");

        for (offset, subject_id) in subject_ids.iter().enumerate() {
            let shift = (offset % 3) as f64 * 0.5;
            let mut terms: Vec<(i16, Option<f64>)> = bimesters
                .iter()
                .enumerate()
                .map(|(i, v)| (i as i16 + 1, Some((v + shift).min(10.0))))
                .collect();
            if status == StudentStatus::Transferred {
                terms.retain(|(term, _)| *term <= 2);
            }
            if let Some(score) = recovery {
                terms.push((5, Some(score)));
            }
            for (term, value) in terms {
                upsert_grade(pool, student_id, *subject_id, term, value).await?;
            }
        }
    }

    sqlx::query(
        r#"
        INSERT INTO academic_records.academic_years
        (year, b1_end, b2_end, b3_end, b4_end, rec_start, rec_end)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (year) DO UPDATE
        SET b1_end = EXCLUDED.b1_end, b2_end = EXCLUDED.b2_end, b3_end = EXCLUDED.b3_end,
            b4_end = EXCLUDED.b4_end, rec_start = EXCLUDED.rec_start, rec_end = EXCLUDED.rec_end
        "#,
    )
    .bind(YEAR)
    .bind(date(YEAR, 4, 30)?)
    .bind(date(YEAR, 7, 10)?)
    .bind(date(YEAR, 9, 30)?)
    .bind(date(YEAR, 12, 10)?)
    .bind(date(YEAR, 12, 14)?)
    .bind(date(YEAR, 12, 18)?)
    .execute(pool)
    .await?;

    info!(subjects = subject_ids.len(), "seed data written");
    Ok(())
}

async fn upsert_grade(
    pool: &PgPool,
    student_id: Uuid,
    subject_id: Uuid,
    term: i16,
    value: Option<f64>,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO academic_records.grades (student_id, subject_id, term, value)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_id, subject_id, term) DO UPDATE SET value = EXCLUDED.value
        "#,
    )
    .bind(student_id)
    .bind(subject_id)
    .bind(term)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Imports grade rows (`student_id,subject_id,term,value`). An empty value
/// records an explicitly missing grade. Rows are validated before anything is
/// written; the first invalid row aborts the import.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_id: String,
        subject_id: String,
        term: u8,
        value: Option<f64>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut entries = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("malformed row at line {line}"))?;
        let entry = GradeEntry::new(row.student_id, row.subject_id, row.term, row.value)
            .with_context(|| format!("invalid grade at line {line}"))?;
        let student = Uuid::parse_str(entry.student_id.as_str())
            .with_context(|| format!("student_id is not a UUID at line {line}"))?;
        let subject = Uuid::parse_str(entry.subject_id.as_str())
            .with_context(|| format!("subject_id is not a UUID at line {line}"))?;
        entries.push((student, subject, entry));
    }

    let mut written = 0usize;
    for (student, subject, entry) in &entries {
        let term = i16::from(entry.term.number());
        if upsert_grade(pool, *student, *subject, term, entry.value).await? > 0 {
            written += 1;
        }
    }

    info!(rows = entries.len(), written, "grade import finished");
    Ok(written)
}

/// Loads everything the engine needs for one academic year.
pub async fn load_snapshot(pool: &PgPool, year: i32) -> anyhow::Result<SchoolSnapshot> {
    let areas: Vec<KnowledgeArea> = sqlx::query(
        "SELECT id, name, formation_type_id FROM academic_records.knowledge_areas",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| KnowledgeArea {
        id: Id::from(row.get::<Uuid, _>("id")),
        name: row.get("name"),
        formation_type_id: Id::from(row.get::<String, _>("formation_type_id")),
    })
    .collect();

    let sub_areas: Vec<SubArea> = sqlx::query(
        "SELECT id, name, knowledge_area_id FROM academic_records.sub_areas",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| SubArea {
        id: Id::from(row.get::<Uuid, _>("id")),
        name: row.get("name"),
        knowledge_area_id: Id::from(row.get::<Uuid, _>("knowledge_area_id")),
    })
    .collect();

    let subjects: Vec<Subject> = sqlx::query(
        "SELECT id, name, year, periodicity, sub_area_id \
         FROM academic_records.subjects WHERE year = $1",
    )
    .bind(year)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| Subject {
        id: Id::from(row.get::<Uuid, _>("id")),
        name: row.get("name"),
        year: row.get("year"),
        periodicity: periodicity_from_db(row.get::<&str, _>("periodicity")),
        sub_area_id: row.get::<Option<Uuid>, _>("sub_area_id").map(Id::from),
    })
    .collect();

    let mut class_subjects: BTreeMap<Uuid, BTreeSet<Id>> = BTreeMap::new();
    for row in sqlx::query(
        "SELECT cs.class_id, cs.subject_id FROM academic_records.class_subjects cs \
         JOIN academic_records.classes c ON c.id = cs.class_id WHERE c.year = $1",
    )
    .bind(year)
    .fetch_all(pool)
    .await?
    {
        class_subjects
            .entry(row.get("class_id"))
            .or_default()
            .insert(Id::from(row.get::<Uuid, _>("subject_id")));
    }

    let classes: Vec<SchoolClass> = sqlx::query(
        "SELECT id, name, year FROM academic_records.classes WHERE year = $1",
    )
    .bind(year)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| {
        let id: Uuid = row.get("id");
        SchoolClass {
            id: Id::from(id),
            name: row.get("name"),
            year: row.get("year"),
            subject_ids: class_subjects.remove(&id).unwrap_or_default(),
        }
    })
    .collect();

    let students: Vec<Student> = sqlx::query(
        "SELECT s.id, s.full_name, s.registration_number, s.class_id, s.status \
         FROM academic_records.students s \
         JOIN academic_records.classes c ON c.id = s.class_id WHERE c.year = $1",
    )
    .bind(year)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| Student {
        id: Id::from(row.get::<Uuid, _>("id")),
        name: row.get("full_name"),
        registration_number: row.get("registration_number"),
        class_id: Id::from(row.get::<Uuid, _>("class_id")),
        status: status_from_db(row.get::<&str, _>("status")),
    })
    .collect();

    let mut grades = GradeBook::default();
    let mut skipped = 0usize;
    for row in sqlx::query(
        "SELECT g.student_id, g.subject_id, g.term, g.value \
         FROM academic_records.grades g \
         JOIN academic_records.subjects sub ON sub.id = g.subject_id WHERE sub.year = $1",
    )
    .bind(year)
    .fetch_all(pool)
    .await?
    {
        let term: i16 = row.get("term");
        let entry = u8::try_from(term)
            .map_err(anyhow::Error::from)
            .and_then(|term| {
                GradeEntry::new(
                    row.get::<Uuid, _>("student_id"),
                    row.get::<Uuid, _>("subject_id"),
                    term,
                    row.get::<Option<f64>, _>("value"),
                )
                .map_err(anyhow::Error::from)
            });
        match entry {
            Ok(entry) => grades.upsert(&entry),
            Err(err) => {
                skipped += 1;
                warn!(error = %err, "skipping stored grade");
            }
        }
    }

    let calendar = sqlx::query(
        "SELECT year, b1_end, b2_end, b3_end, b4_end, rec_start, rec_end \
         FROM academic_records.academic_years WHERE year = $1",
    )
    .bind(year)
    .fetch_optional(pool)
    .await?
    .map(|row| {
        AcademicYearConfig {
            year: row.get("year"),
            b1_end: row.get("b1_end"),
            b2_end: row.get("b2_end"),
            b3_end: row.get("b3_end"),
            b4_end: row.get("b4_end"),
            rec_start: row.get("rec_start"),
            rec_end: row.get("rec_end"),
        }
        .normalized()
    });
    if calendar.is_none() {
        warn!(year, "no academic calendar configured, deadlines are disabled");
    }

    info!(
        year,
        students = students.len(),
        subjects = subjects.len(),
        grades = grades.len(),
        skipped,
        "snapshot loaded"
    );

    Ok(SchoolSnapshot {
        year,
        catalog: Catalog::new(subjects, sub_areas, areas, classes),
        students,
        grades,
        calendar,
    })
}
