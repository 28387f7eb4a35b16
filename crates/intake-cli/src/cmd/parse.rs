use super::BodyArgs;
use crate::output::{print_json, print_table};
use intake_core::request;
use intake_core::IntakeError;

pub fn run(body: &BodyArgs, json: bool) -> anyhow::Result<()> {
    let text = body.read()?;
    let requests = match request::parse(&text) {
        Ok(requests) => requests,
        Err(IntakeError::NoSections) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    if json {
        return print_json(&requests);
    }
    if requests.is_empty() {
        println!("No actions requested.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = requests
        .iter()
        .map(|r| {
            vec![
                r.section.clone(),
                r.name.clone(),
                r.version.clone(),
                r.composite_key(),
                r.description.lines().next().unwrap_or_default().to_string(),
            ]
        })
        .collect();
    print_table(&["SECTION", "NAME", "VERSION", "ENTRY", "DESCRIPTION"], &rows);
    Ok(())
}
