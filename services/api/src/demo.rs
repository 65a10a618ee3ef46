use crate::infra::{seed_sample_campus, LoggingNotifier, SAMPLE_DEPARTMENTS};
use chrono::Local;
use clap::Args;
use exam_seating::allocation::{
    AllocationRequest, AllocationSummary, InMemorySeatingStore, NewHall, SeatAllocationService,
    SeatView, SeatingError, SeatingGrid,
};
use exam_seating::config::AppConfig;
use exam_seating::error::AppError;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Departments to seat, comma separated. Defaults to every sample department.
    #[arg(long, value_delimiter = ',')]
    pub(crate) departments: Vec<String>,
    /// Capacity of the demo hall.
    #[arg(long, default_value_t = 60)]
    pub(crate) capacity: u32,
    /// Levels seated in even columns (requires --second-levels).
    #[arg(long, value_delimiter = ',')]
    pub(crate) first_levels: Option<Vec<u32>>,
    /// Levels seated in odd columns (requires --first-levels).
    #[arg(long, value_delimiter = ',')]
    pub(crate) second_levels: Option<Vec<u32>>,
    /// Print the notification preview for the hall.
    #[arg(long)]
    pub(crate) show_notices: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        departments,
        capacity,
        first_levels,
        second_levels,
        show_notices,
    } = args;

    let config = AppConfig::load()?;
    let policy = config.seating.policy()?;
    let grid = policy.grid.clone();

    let store = Arc::new(InMemorySeatingStore::new());
    seed_sample_campus(&store).map_err(SeatingError::from)?;
    let notifier = Arc::new(LoggingNotifier::default());
    let service = SeatAllocationService::new(store, notifier.clone(), policy);

    let hall = service.create_hall(NewHall {
        number: 101,
        name: "Main Hall".to_string(),
        capacity,
        rows: grid.rows(),
        columns: grid.columns().len() as u32,
    })?;

    let departments = if departments.is_empty() {
        SAMPLE_DEPARTMENTS
            .iter()
            .map(|(name, _, _)| name.to_string())
            .collect()
    } else {
        departments
    };

    println!(
        "Exam seating demo ({})",
        Local::now().format("%Y-%m-%d %H:%M")
    );
    println!(
        "Hall {} \"{}\": capacity {}, grid {} columns x {} rows",
        hall.number,
        hall.name,
        hall.capacity,
        grid.columns().len(),
        grid.rows()
    );
    println!("Selected departments: {}", departments.join(", "));

    let summary = service.allocate(AllocationRequest {
        hall_id: hall.id,
        departments,
        first_level_group: first_levels,
        second_level_group: second_levels,
    })?;
    let roster = service.roster(hall.id)?;

    print!("{}", render_summary(&summary, &roster, &grid));

    if show_notices {
        for notice in notifier.sent() {
            println!("\nNotice: {}", notice.subject());
            println!("Recipients (bcc): {}", notice.recipients.len());
            println!("{}", notice.body());
        }
    }

    Ok(())
}

fn render_summary(summary: &AllocationSummary, roster: &[SeatView], grid: &SeatingGrid) -> String {
    let mut output = String::new();

    let staff: Vec<&SeatView> = roster
        .iter()
        .filter(|view| !view.seat.is_grid_label())
        .collect();
    if staff.is_empty() {
        let _ = writeln!(output, "\nStage: empty");
    }
    for view in staff {
        let _ = writeln!(
            output,
            "\nStage ({}): {} {} (#{})",
            view.seat, view.first_name, view.last_name, view.person_id
        );
    }

    output.push_str("\nSeat map (person ids)\n");
    output.push_str(&render_seat_map(grid, roster));

    let _ = writeln!(
        output,
        "\nSeated {} (staff {}), rejected {}, unseated {}",
        summary.seated_total(),
        summary.staff.len(),
        summary.grid.rejected.len() + summary.staff_rejected.len(),
        summary.grid.unseated
    );
    match summary.available_slots {
        Some(slots) => {
            let _ = writeln!(output, "Available slots: {slots}");
        }
        None => output.push_str("Available slots: not updated\n"),
    }
    if !summary.excluded_departments.is_empty() {
        let _ = writeln!(
            output,
            "Excluded (level outside both groups): {}",
            summary.excluded_departments.join(", ")
        );
    }
    for rejected in summary.staff_rejected.iter().chain(&summary.grid.rejected) {
        let _ = writeln!(
            output,
            "  rejected #{} at {}: {}",
            rejected.person_id, rejected.seat, rejected.reason
        );
    }

    output
}

/// One line per row, one cell per column; `--` marks an empty seat.
fn render_seat_map(grid: &SeatingGrid, roster: &[SeatView]) -> String {
    let occupants: HashMap<&str, String> = roster
        .iter()
        .map(|view| (view.seat.as_str(), view.person_id.to_string()))
        .collect();

    let mut output = String::from("    ");
    for column in grid.columns() {
        let _ = write!(output, "{column:>5}");
    }
    output.push('\n');

    for row in 1..=grid.rows() {
        let _ = write!(output, "{row:>3} ");
        for index in 0..grid.columns().len() {
            let label = grid.label(index, row);
            let cell = occupants.get(label.as_str()).map_or("--", String::as_str);
            let _ = write!(output, "{cell:>5}");
        }
        output.push('\n');
    }
    output
}
