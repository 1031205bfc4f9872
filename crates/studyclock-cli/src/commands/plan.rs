use studyclock_core::{format_remaining, Config, Template};

use super::PlanSource;

pub fn run(source: PlanSource) -> Result<(), Box<dyn std::error::Error>> {
    let plan = source.resolve(&Config::load()?)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

pub fn templates(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let plans: Vec<_> = Template::ALL
            .iter()
            .map(|t| serde_json::json!({ "template": t.name(), "plan": t.plan() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }

    for template in Template::ALL {
        let plan = template.plan();
        println!(
            "{:<10} {:>9}  {} phases  {}",
            template.name(),
            format_remaining(plan.total_duration_secs()),
            plan.len(),
            plan.description()
        );
    }
    Ok(())
}
