use crate::infra::in_memory_service;
use clap::Args;
use seat_allot::error::AppError;
use seat_allot::workflows::allocation::{
    AllocationReportView, AllocationStatus, AuditRecord, Category, CompletedRun, EntranceRecord,
    Gender, Stream, Student, StudentId, VacancyEntry, MAX_CHOICES,
};
use seat_allot::workflows::intake::{write_allocations, AllocationDataset, DatasetImporter};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

const OFFLINE_OPERATOR: &str = "cli";

#[derive(Args, Debug)]
pub(crate) struct AllocateArgs {
    /// Student export with merit numbers and ranked district choices
    #[arg(long)]
    pub(crate) students: PathBuf,
    /// Entrance-test export carrying gender and reservation category
    #[arg(long)]
    pub(crate) entrance: PathBuf,
    /// Vacancy table keyed by district, stream, gender, and category
    #[arg(long)]
    pub(crate) vacancies: PathBuf,
    /// Write the updated student allocations to this CSV file
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Print the run report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Seats offered in the Mohali medical pool.
    #[arg(long, default_value_t = 2)]
    pub(crate) seats: u32,
    /// Print the run report as JSON instead of text.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_allocate(args: AllocateArgs) -> Result<(), AppError> {
    let AllocateArgs {
        students,
        entrance,
        vacancies,
        output,
        json,
    } = args;

    let dataset = DatasetImporter::from_paths(students, entrance, vacancies)?;
    let outcome = execute(dataset)?;
    render_run(&outcome, json)?;

    if let Some(path) = output {
        let writer = BufWriter::new(File::create(&path)?);
        write_allocations(writer, &outcome.students)?;
        println!("\nAllocations written to {}", path.display());
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { seats, json } = args;

    if !json {
        println!("District seat allocation demo");
        println!("- Mohali medical pool (Male/Open) with {seats} seat(s)");
        println!("- Three applicants listing Mohali as their first choice\n");
    }

    let outcome = execute(demo_dataset(seats))?;
    render_run(&outcome, json)
}

struct OfflineRun {
    run: CompletedRun,
    /// Student records after the run, in merit order.
    students: Vec<Student>,
    audit: Vec<AuditRecord>,
}

/// Run one allocation against a throwaway in-memory store.
fn execute(dataset: AllocationDataset) -> Result<OfflineRun, AppError> {
    let (service, store, audit) = in_memory_service(dataset);
    let run = service.run(OFFLINE_OPERATOR)?;
    let mut students = store.students();
    students.sort_by_key(|student| student.merit_number);
    Ok(OfflineRun {
        run,
        students,
        audit: audit.events(),
    })
}

pub(crate) fn demo_dataset(seats: u32) -> AllocationDataset {
    let applicants = [("s1", 1), ("s2", 2), ("s3", 3)];

    let students = applicants
        .iter()
        .rev()
        .map(|(id, merit)| {
            let mut choices = vec![None; MAX_CHOICES];
            choices[0] = Some("Mohali".to_string());
            Student {
                id: StudentId((*id).to_string()),
                application_number: Some(format!("APP-{id}")),
                merit_number: *merit,
                stream: Stream::Medical,
                choices,
                allotted_district: None,
                allotted_stream: None,
                allocation_status: AllocationStatus::Pending,
            }
        })
        .collect();

    let entrance_records = applicants
        .iter()
        .map(|(id, merit)| EntranceRecord {
            application_number: format!("APP-{id}"),
            roll_number: Some(format!("R-{merit:03}")),
            marks: Some(620 - merit * 10),
            stream: Some(Stream::Medical),
            gender: Gender::Male,
            category: Category::Open,
        })
        .collect();

    let vacancies = vec![VacancyEntry {
        district: "Mohali".to_string(),
        stream: Stream::Medical,
        gender: Gender::Male,
        category: Category::Open,
        total_seats: seats,
        available_seats: Some(seats),
    }];

    AllocationDataset {
        students,
        entrance_records,
        vacancies,
    }
}

fn render_run(outcome: &OfflineRun, json: bool) -> Result<(), AppError> {
    let OfflineRun {
        run,
        students,
        audit,
    } = outcome;
    let view = run.view();
    if json {
        let payload = serde_json::to_string_pretty(&view).map_err(std::io::Error::from)?;
        println!("{payload}");
        return Ok(());
    }

    render_report(&view, run.result.allotment_rate());
    render_streams(students);
    render_students(students);

    if run.is_fully_allotted() {
        println!("\nEvery eligible student received a seat.");
    }
    for entry in audit {
        println!(
            "\nAudit: {} by {} finished {}",
            entry.action,
            entry.operator,
            entry.finished_at.to_rfc3339()
        );
    }
    Ok(())
}

fn render_report(view: &AllocationReportView, rate: f32) {
    println!("Allocation run summary");
    println!(
        "- {} eligible | {} allotted | {} not allotted | {:.0}% placement",
        view.total,
        view.allotted,
        view.not_allotted,
        rate * 100.0
    );

    if view.district_allotments.is_empty() {
        println!("District allotments: none");
    } else {
        println!("District allotments:");
        for entry in &view.district_allotments {
            println!("  - {}: {}", entry.district, entry.allotted);
        }
    }

    println!("Pool utilization:");
    for pool in &view.pool_utilization {
        println!(
            "  - {}: {} of {} claimed ({} remaining, {} total seats)",
            pool.key, pool.consumed, pool.initial_available, pool.remaining, pool.total_seats
        );
    }
}

fn render_streams(students: &[Student]) {
    println!("Allotted by stream:");
    for stream in Stream::ordered() {
        let allotted = students
            .iter()
            .filter(|student| student.allotted_stream == Some(stream))
            .count();
        if allotted > 0 {
            println!("  - {}: {allotted}", stream.label());
        }
    }
}

fn render_students(students: &[Student]) {
    println!("Students (merit order):");
    for student in students {
        let placement = student
            .allotted_district
            .as_deref()
            .unwrap_or("-");
        println!(
            "  - #{:<4} {:<12} {:<10} {:<13} {}",
            student.merit_number,
            student.id.0,
            student.stream.label(),
            student.allocation_status.label(),
            placement
        );
    }
}
