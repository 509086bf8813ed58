use crate::infra::{
    load_rate_schedule, InMemoryLoanApplicationRepository, InMemoryNotificationPublisher,
};
use chrono::{Local, Months, NaiveDate};
use clap::Args;
use loanflow::config::{AppConfig, RateConfig};
use loanflow::error::AppError;
use loanflow::workflows::lending::applications::{
    LoanApplicationRecord, LoanApplicationService, StatusAction,
};
use loanflow::workflows::lending::intake::{
    compute_progress, ApplicationDraft, ProgressReport, SubmissionPayload,
};
use loanflow::workflows::lending::quote::{
    AmortizationSchedule, LoanQuote, QuoteEngine, QuoteOutcome, RateSchedule,
};
use loanflow::workflows::lending::LoanCategory;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Loan category (with-collateral, without-collateral, open-term)
    #[arg(long)]
    pub(crate) category: LoanCategory,
    /// Principal as typed by the borrower; thousands separators are accepted
    #[arg(long)]
    pub(crate) principal: String,
    /// Print the monthly installment schedule for fixed-term loans
    #[arg(long)]
    pub(crate) schedule: bool,
    /// Due date of the first installment (defaults to one month from today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) first_due: Option<NaiveDate>,
    /// JSON rate table to quote against instead of APP_RATE_TABLE / the standard tables
    #[arg(long)]
    pub(crate) rate_table: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RatesArgs {
    /// JSON rate table to print instead of APP_RATE_TABLE / the standard tables
    #[arg(long)]
    pub(crate) rate_table: Option<PathBuf>,
    /// Emit the schedule as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Loan category for the sample application
    #[arg(long, default_value = "with-collateral")]
    pub(crate) category: LoanCategory,
    /// Requested principal for the sample application
    #[arg(long, default_value = "75000")]
    pub(crate) principal: String,
    /// Submission date (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

fn resolve_schedule(rate_table: Option<PathBuf>) -> Result<RateSchedule, AppError> {
    let config = match rate_table {
        Some(path) => RateConfig {
            table_path: Some(path),
        },
        None => AppConfig::load()?.rates,
    };
    load_rate_schedule(&config)
}

fn one_month_after(date: NaiveDate) -> NaiveDate {
    date.checked_add_months(Months::new(1)).unwrap_or(date)
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let engine = QuoteEngine::new(resolve_schedule(args.rate_table)?);

    match engine.quote_input(args.category, &args.principal) {
        QuoteOutcome::Quoted(quote) => {
            render_quote(&quote);
            if args.schedule {
                let first_due = args
                    .first_due
                    .unwrap_or_else(|| one_month_after(Local::now().date_naive()));
                match AmortizationSchedule::for_quote(&quote, first_due) {
                    Some(schedule) => render_schedule(&schedule),
                    None => println!("\nOpen-term loans have no installment schedule."),
                }
            }
        }
        QuoteOutcome::NotEligible(reason) => {
            println!("{} loan: not eligible", args.category);
            println!("  {}", reason.summary());
        }
    }

    Ok(())
}

pub(crate) fn run_rates(args: RatesArgs) -> Result<(), AppError> {
    let schedule = resolve_schedule(args.rate_table)?;

    if args.json {
        match serde_json::to_string_pretty(&schedule) {
            Ok(json) => println!("{json}"),
            Err(err) => return Err(AppError::Usage(format!("unable to render rates: {err}"))),
        }
        return Ok(());
    }

    println!("Rate tables ({})", schedule.version);
    for (category, table) in schedule.tables() {
        println!("\n{category}");
        println!("  {:>12}  {:>8}  {:>10}", "From", "Term", "Rate/month");
        for entry in table.entries() {
            let term = entry
                .term_months
                .map(|months| format!("{months} mo"))
                .unwrap_or_else(|| "open".to_string());
            println!(
                "  {:>12}  {:>8}  {:>9}%",
                entry.min_principal, term, entry.monthly_interest_rate_percent
            );
        }
    }

    Ok(())
}

fn render_quote(quote: &LoanQuote) {
    println!("{} loan quote", quote.category);
    println!("  Principal:          {}", quote.principal);
    match quote.term_months {
        Some(term) => println!("  Term:               {term} months"),
        None => println!("  Term:               open"),
    }
    println!(
        "  Interest rate:      {}% per month",
        quote.monthly_interest_rate_percent
    );
    if let Some(payment) = quote.monthly_payment {
        println!("  Monthly payment:    {payment}");
    }
    println!("  Service charge:     {}", quote.service_charge);
    println!("  Net proceeds:       {}", quote.net_proceeds);
    println!("  Total interest:     {}", quote.total_interest);
    println!("  Total repayment:    {}", quote.total_repayment);
}

fn render_schedule(schedule: &AmortizationSchedule) {
    println!(
        "\n  {:>3}  {:<10}  {:>12}  {:>10}  {:>12}",
        "#", "Due", "Principal", "Interest", "Balance"
    );
    for installment in &schedule.installments {
        println!(
            "  {:>3}  {:<10}  {:>12}  {:>10}  {:>12}",
            installment.number,
            installment.due_on,
            installment.principal_portion,
            installment.interest_portion,
            installment.balance_after
        );
    }
    println!("  Total due: {}", schedule.total_due());
}

fn render_progress(step: &str, report: &ProgressReport) {
    println!(
        "\n{step}: {}/{} sections complete",
        report.completed_sections(),
        report.sections.len()
    );
    for section in &report.sections {
        let marker = if section.is_complete && section.invalid_field_labels.is_empty() {
            "x"
        } else {
            " "
        };
        println!(
            "  [{marker}] {} ({}/{})",
            section.section_label, section.satisfied_count, section.required_count
        );
        if !section.missing_field_labels.is_empty() {
            println!("      missing: {}", section.missing_field_labels.join(", "));
        }
        if !section.invalid_field_labels.is_empty() {
            println!("      invalid: {}", section.invalid_field_labels.join(", "));
        }
    }
}

fn fill_applicant(draft: &mut ApplicationDraft) {
    for (key, value) in [
        ("first_name", "Maria"),
        ("last_name", "Santos"),
        ("date_of_birth", "1988-04-12"),
        ("marital_status", "Married"),
        ("spouse_name", "Paolo Santos"),
        ("spouse_occupation", "Jeepney operator"),
        ("email", "maria.santos@example.com"),
        ("contact_number", "0917-123-4567"),
        ("address", "12 Mabini St, Quezon City"),
    ] {
        draft.basic_info.set(key, value);
    }
    for (key, value) in [
        ("source_of_income", "business"),
        ("monthly_income", "42,000"),
        ("business_name", "Santos Sari-Sari Store"),
        ("business_type", "Retail"),
        ("business_address", "Quezon City"),
    ] {
        draft.income.set(key, value);
    }
}

fn fill_references(draft: &mut ApplicationDraft) -> Result<(), AppError> {
    let references = [
        ("Jose Reyes", "09181234567", "Supplier"),
        ("Ana Cruz", "09191234567", "Neighbor"),
        ("Ben Dela Rosa", "09201234567", "Former employer"),
    ];
    for (index, (name, contact, relation)) in references.into_iter().enumerate() {
        let slot = index + 1;
        for (field, value) in [("name", name), ("contact", contact), ("relation", relation)] {
            draft
                .set_reference(slot, field, value)
                .map_err(|err| AppError::Usage(err.to_string()))?;
        }
    }
    Ok(())
}

fn fill_loan(draft: &mut ApplicationDraft, principal: &str) {
    for (key, value) in [
        ("collateral_type", "Vehicle"),
        ("collateral_description", "2019 delivery van"),
        ("collateral_value", "450000"),
    ] {
        draft.collateral.set(key, value);
    }
    draft.loan_details.set("loan_amount", principal);
    draft.loan_details.set("loan_purpose", "Store inventory");
    for (key, value) in [
        ("valid_id", "umid.pdf"),
        ("proof_of_income", "sales-ledger.pdf"),
        ("proof_of_billing", "meralco.png"),
        ("collateral_document", "van-orcr.jpg"),
    ] {
        draft.uploads.set(key, value);
    }
}

fn render_record(step: &str, record: &LoanApplicationRecord) {
    let view = record.status_view();
    print!("  {step}: {} is {}", view.application_id.0, view.status);
    if let Some(outstanding) = view.outstanding {
        print!(" (outstanding {outstanding})");
    }
    println!();
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let category = args.category;
    let repository = Arc::new(InMemoryLoanApplicationRepository::default());
    let notifications = Arc::new(InMemoryNotificationPublisher::default());
    let service = LoanApplicationService::new(
        repository,
        notifications.clone(),
        QuoteEngine::new(RateSchedule::standard()),
    );

    println!("Loan origination demo: {category} loan of {}", args.principal);

    let mut draft = ApplicationDraft::new();
    render_progress("Empty draft", &compute_progress(&draft, category));

    fill_applicant(&mut draft);
    draft.basic_info.set("email", "maria.santos@");
    render_progress("Applicant details entered", &service.progress(&draft, category));

    draft.basic_info.set("email", "maria.santos@example.com");
    fill_references(&mut draft)?;
    fill_loan(&mut draft, &args.principal);
    let report = service.progress(&draft, category);
    render_progress("All sections entered", &report);

    match SubmissionPayload::from_draft(&draft, category) {
        Ok(payload) => println!(
            "\nUpstream post: {} ({} fields, {} files)",
            payload.endpoint,
            payload.fields.len(),
            payload.files.len()
        ),
        Err(blocked) => println!("\nUpstream post blocked: {blocked}"),
    }

    let record = match service.submit(category, draft, today) {
        Ok(record) => record,
        Err(err) => {
            println!("\nSubmission rejected: {err}");
            return Ok(());
        }
    };
    println!();
    render_quote(&record.quote);

    println!("\nLifecycle");
    render_record("submitted", &record);
    let id = record.application_id.clone();
    let steps = [
        ("review started", StatusAction::BeginReview),
        ("approved", StatusAction::Approve),
        ("disbursed", StatusAction::Disburse),
    ];
    let mut current = record;
    for (step, action) in steps {
        match service.transition(&id, action, today) {
            Ok(updated) => {
                render_record(step, &updated);
                current = updated;
            }
            Err(err) => {
                println!("  {step} failed: {err}");
                return Ok(());
            }
        }
    }

    if let Some(schedule) = &current.schedule {
        render_schedule(schedule);
        let payments: Vec<_> = schedule
            .installments
            .iter()
            .take(2)
            .map(|installment| (installment.amount, installment.due_on))
            .collect();
        for (amount, paid_on) in payments {
            match service.record_payment(&id, amount, paid_on) {
                Ok(updated) => render_record(&format!("paid {amount} on {paid_on}"), &updated),
                Err(err) => println!("  payment failed: {err}"),
            }
        }
        if let Some(last_paid) = schedule.installments.get(1) {
            let as_of = one_month_after(one_month_after(last_paid.due_on));
            match service.collections(&id, as_of) {
                Ok(snapshot) => println!(
                    "\nCollections as of {as_of}: outstanding {}, {} overdue ({})",
                    snapshot.outstanding,
                    snapshot.overdue_installments,
                    snapshot.overdue_amount
                ),
                Err(err) => println!("\nCollections unavailable: {err}"),
            }
        }
    } else {
        let payoff = current.outstanding();
        let paid_on = one_month_after(today);
        match service.record_payment(&id, payoff, paid_on) {
            Ok(updated) => render_record(&format!("paid {payoff} on {paid_on}"), &updated),
            Err(err) => println!("  payment failed: {err}"),
        }
    }

    let events = notifications.events();
    if events.is_empty() {
        println!("\nBorrower notifications: none");
    } else {
        println!("\nBorrower notifications");
        for event in events {
            println!("  - {} ({})", event.template, event.application_id.0);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use loanflow::workflows::lending::intake::SectionKey;

    #[test]
    fn sample_draft_is_submittable_for_every_category() {
        for category in LoanCategory::ordered() {
            let mut draft = ApplicationDraft::new();
            fill_applicant(&mut draft);
            fill_references(&mut draft).expect("reference slots exist");
            fill_loan(&mut draft, "75000");

            let report = compute_progress(&draft, category);
            assert!(report.is_submittable, "{category} sample draft incomplete");
            assert!(report
                .section(SectionKey::BasicInfo)
                .expect("tracked")
                .invalid_field_labels
                .is_empty());
        }
    }

    #[test]
    fn demo_runs_to_completion_for_each_category() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 15).expect("valid");
        for category in LoanCategory::ordered() {
            run_demo(DemoArgs {
                category,
                principal: "75000".to_string(),
                today: Some(today),
            })
            .expect("demo completes");
        }
    }

    #[test]
    fn quote_command_reads_an_explicit_rate_table() {
        let result = run_quote(QuoteArgs {
            category: LoanCategory::OpenTerm,
            principal: "60000".to_string(),
            schedule: true,
            first_due: None,
            rate_table: Some(PathBuf::from("missing-rates.json")),
        });
        assert!(matches!(result, Err(AppError::RateTable(_))));
    }
}
