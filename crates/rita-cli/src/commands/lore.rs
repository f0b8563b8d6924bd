//! Lore command - where the name comes from

use console::style;

use crate::error::Result;

const TITLE: &str = "RITA - Render It Then Argue";

const STORY: &str = "\
Chart reviews used to be guesswork. A values file changed, a template moved,
and the pull request showed none of what the cluster would actually receive.

Reviewers were left asking questions nobody could answer from the diff:

    \"Did the replica count change?\"
    \"Where did this ConfigMap come from?\"
    \"Who added that annotation to the Service?\"

So the charts get rendered first, and the argument happens afterwards,
about manifests that really exist.";

const ACRONYM: [(&str, &str); 4] = [
    ("R", "Render   turn charts and values into Kubernetes manifests"),
    ("I", "It       the YAML that will really be applied"),
    ("T", "Then     only once it is on the page"),
    ("A", "Argue    about real changes instead of imagined ones"),
];

const MOTTO: &str = "Render it first. Then argue.";

pub fn run() -> Result<()> {
    let rule = "═".repeat(64);
    println!();
    println!("  {}", style(TITLE).magenta().bold());
    println!("  {}", style(&rule).dim());
    println!();
    for line in STORY.lines() {
        println!("  {}", line);
    }
    println!();
    for (letter, meaning) in ACRONYM {
        println!("    {} {}", style(letter).cyan().bold(), meaning);
    }
    println!();
    println!("  {}", style(&rule).dim());
    println!("  {}", style(MOTTO).italic());
    println!();
    Ok(())
}
