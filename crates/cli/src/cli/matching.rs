use metascan_core::{AntPathMatcher, PathMatcher};

pub fn run(pattern: String, path: String, start: bool) -> Result<(), Box<dyn std::error::Error>> {
    let matcher = AntPathMatcher::new();
    let matched = if start {
        matcher.match_start(&pattern, &path)
    } else {
        matcher.match_path(&pattern, &path)
    };
    println!("{matched}");

    if matched && !start {
        let within = matcher.extract_path_within_pattern(&pattern, &path);
        if !within.is_empty() {
            println!("within pattern: {within}");
        }
        let variables = matcher.extract_uri_template_variables(&pattern, &path)?;
        for (name, value) in &variables {
            println!("{name} = {value}");
        }
    }
    Ok(())
}
