use anyhow::Context;

/// Reads the newline-delimited host list. Surrounding whitespace and blank
/// lines are ignored; the remaining order is the order hosts appear in every
/// snapshot.
pub fn load_hosts(path: &str) -> anyhow::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("could not read host list from {path}"))?;
    let hosts = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    Ok(hosts)
}
