//! Plain-text rendering of boards and reports.

use taskboard_core::{ActivityEvent, CompletedCardSnapshot, WeeklyReport};
use taskboard_work::BoardOverview;

pub fn board(overview: &BoardOverview) {
    println!("Board: {} ({})", overview.board.title, overview.board.id);
    for (list, cards) in &overview.lists {
        println!("  [{}] {} ({})", list.title, list.id, cards.len());
        for card in cards {
            let mark = if card.is_completed { "x" } else { " " };
            let due = card
                .due_date
                .map(|d| format!(" due {}", d))
                .unwrap_or_default();
            println!("    [{}] {} - {}{}", mark, card.id, card.title, due);
        }
    }
}

pub fn report(report: &WeeklyReport) {
    println!(
        "Weekly report {} ({} ~ {})",
        report.id, report.week_start_date, report.week_end_date
    );
    println!("  Status: {}", report.status);
    if let Some(at) = report.submitted_at {
        println!("  Submitted: {}", at.format("%Y-%m-%d %H:%M"));
    }
    println!("  Total hours: {:.1}", report.total_hours);

    println!();
    println!("Completed ({})", report.completed_cards.len());
    for card in &report.completed_cards {
        completed_card(card);
    }

    println!();
    println!("In progress ({})", report.in_progress_cards.len());
    for card in &report.in_progress_cards {
        let input = &card.user_input;
        println!(
            "  {} | {} | {} | {}% | {:.1}h",
            card.card_id,
            card.title,
            input.status,
            card.effective_progress(),
            card.effective_hours()
        );
        if let Some(date) = input.expected_completion_date {
            println!("      expected: {}", date);
        }
        if !input.description.trim().is_empty() {
            println!("      {}", input.description.trim());
        }
        if !input.issues.trim().is_empty() {
            println!("      issues: {}", input.issues.trim());
        }
        println!(
            "      checklist {}%, {} comment(s), {:.1}h logged",
            card.auto_collected.checklist_progress,
            card.auto_collected.comment_count,
            card.auto_collected.weekly_hours
        );
    }

    println!();
    println!("Activity ({})", report.card_activities.len());
    for event in &report.card_activities {
        activity(event);
    }

    if !report.notes.trim().is_empty() {
        println!();
        println!("Notes:");
        for line in report.notes.lines() {
            println!("  {}", line);
        }
    }
}

pub fn completed_card(card: &CompletedCardSnapshot) {
    let when = card
        .completed_at
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let who = card
        .completed_by
        .as_ref()
        .map(|p| p.display_name.as_str())
        .unwrap_or("unknown");
    println!(
        "  {} | {} | {} | {} by {} | checklist {}% | {:.1}h",
        card.card_id, card.title, card.list_title, when, who, card.checklist_progress, card.weekly_hours
    );
}

fn activity(event: &ActivityEvent) {
    let at = event.at().format("%m-%d %H:%M");
    match event {
        ActivityEvent::Created { card_title, list_title, .. } => {
            println!("  {} created   {} in {}", at, card_title, list_title)
        }
        ActivityEvent::Updated { card_title, .. } => println!("  {} updated   {}", at, card_title),
        ActivityEvent::Completed { card_title, .. } => println!("  {} completed {}", at, card_title),
        ActivityEvent::ChecklistItemCompleted {
            card_title,
            item_content,
            hours,
            ..
        } => println!("  {} checked   {} / {} ({:.1}h)", at, card_title, item_content, hours),
    }
}
