//! Canned execution output: generated code, script runs, API calls and
//! scaffolded files.

use rand::Rng;
use waypoint_db::models::ExecutionType;

use super::{KeywordRule, KeywordTable};
use crate::agent::ExecutionOutput;

/// Kind of source file produced by code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeType {
    React,
    Api,
    Database,
    Html,
    Python,
    JavaScript,
    General,
}

/// Matched against [`word_padded`] text, so a keyword with surrounding
/// spaces only hits a whole word.
pub const CODE_TYPE_TABLE: KeywordTable<CodeType> = KeywordTable::new(
    &[
        KeywordRule {
            keywords: &["react", "component", "frontend", "user interface", " ui "],
            value: CodeType::React,
        },
        KeywordRule {
            keywords: &[" api ", " apis ", "endpoint", "backend", "restful"],
            value: CodeType::Api,
        },
        KeywordRule {
            keywords: &["database", " sql ", "schema", " table ", " tables "],
            value: CodeType::Database,
        },
        KeywordRule {
            keywords: &["html", "webpage", "landing page", "website"],
            value: CodeType::Html,
        },
        KeywordRule {
            keywords: &["python", "django", "flask", "pandas"],
            value: CodeType::Python,
        },
        KeywordRule {
            keywords: &["javascript", "node js", "nodejs", "typescript"],
            value: CodeType::JavaScript,
        },
    ],
    CodeType::General,
);

impl CodeType {
    pub fn file_path(self) -> &'static str {
        match self {
            Self::React => "src/components/GeneratedComponent.jsx",
            Self::Api => "src/routes/api.js",
            Self::Database => "db/schema.sql",
            Self::Html => "public/index.html",
            Self::Python => "main.py",
            Self::JavaScript => "src/index.js",
            Self::General => "output/solution.txt",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Self::React => REACT_SOURCE,
            Self::Api => API_SOURCE,
            Self::Database => DATABASE_SOURCE,
            Self::Html => HTML_SOURCE,
            Self::Python => PYTHON_SOURCE,
            Self::JavaScript => JAVASCRIPT_SOURCE,
            Self::General => GENERAL_SOURCE,
        }
    }
}

pub fn detect_code_type(instructions: &str) -> CodeType {
    CODE_TYPE_TABLE.select(&word_padded(instructions))
}

/// `text` with every non-alphanumeric run turned into a space and a space
/// at each end: `"REST api."` becomes `" REST api "`.
fn word_padded(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for c in text.chars() {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.ends_with(' ') {
            out.push(' ');
        }
    }
    if !out.ends_with(' ') {
        out.push(' ');
    }
    out
}

/// One generated source file for `instructions`.
pub fn generate_code(instructions: &str) -> ExecutionOutput {
    let code_type = detect_code_type(instructions);
    ExecutionOutput {
        output_type: "code".to_owned(),
        content: code_type.source().to_owned(),
        file_path: Some(code_type.file_path().to_owned()),
        success: true,
    }
}

/// Simulated script run, picked from a fixed pool.
pub fn script_output<R: Rng + ?Sized>(rng: &mut R) -> ExecutionOutput {
    let content = SCRIPT_POOL[rng.random_range(0..SCRIPT_POOL.len())];
    ExecutionOutput {
        output_type: "script_output".to_owned(),
        content: content.to_owned(),
        file_path: None,
        success: true,
    }
}

/// Simulated API response, picked from a fixed pool.
pub fn api_call_output<R: Rng + ?Sized>(rng: &mut R) -> ExecutionOutput {
    let content = API_POOL[rng.random_range(0..API_POOL.len())];
    ExecutionOutput {
        output_type: "api_response".to_owned(),
        content: content.to_owned(),
        file_path: None,
        success: true,
    }
}

/// One output row per scaffolded project file.
pub fn scaffold_files(instructions: &str) -> Vec<ExecutionOutput> {
    let readme = format!("# Generated Project\n\n{instructions}\n\n## Getting started\n\nnpm install\nnpm start\n");
    [
        ("README.md", readme),
        ("package.json", PACKAGE_JSON.to_owned()),
        ("src/index.js", INDEX_JS.to_owned()),
    ]
    .into_iter()
    .map(|(path, content)| ExecutionOutput {
        output_type: "file".to_owned(),
        content,
        file_path: Some(path.to_owned()),
        success: true,
    })
    .collect()
}

/// Output rows for one execution request.
pub fn execution_outputs<R: Rng + ?Sized>(
    execution_type: ExecutionType,
    instructions: &str,
    rng: &mut R,
) -> Vec<ExecutionOutput> {
    match execution_type {
        ExecutionType::CodeGeneration => vec![generate_code(instructions)],
        ExecutionType::ScriptExecution => vec![script_output(rng)],
        ExecutionType::ApiCall => vec![api_call_output(rng)],
        ExecutionType::FileCreation => scaffold_files(instructions),
    }
}

const SCRIPT_POOL: [&str; 3] = [
    "$ ./run.sh\nInstalling dependencies... done\nRunning checks... 12 passed, 0 failed\nScript finished in 3.2s",
    "$ ./run.sh\nProcessing 248 records...\nWrote report to output/report.csv\nScript finished in 1.7s",
    "$ ./run.sh\nValidating configuration... ok\nMigrating data... 3 tables updated\nScript finished in 5.4s",
];

const API_POOL: [&str; 3] = [
    r#"{"status": 200, "data": {"id": "res_1042", "state": "created"}, "latency_ms": 184}"#,
    r#"{"status": 200, "data": {"items": 17, "next_page": null}, "latency_ms": 96}"#,
    r#"{"status": 202, "data": {"job_id": "job_77", "state": "queued"}, "latency_ms": 231}"#,
];

const PACKAGE_JSON: &str = r#"{
  "name": "generated-project",
  "version": "0.1.0",
  "private": true,
  "scripts": {
    "start": "node src/index.js"
  }
}
"#;

const INDEX_JS: &str = r#"console.log("Project scaffold ready");
"#;

const REACT_SOURCE: &str = r#"import React, { useState } from "react";

export default function GeneratedComponent() {
  const [count, setCount] = useState(0);

  return (
    <div className="generated-component">
      <h2>Generated Component</h2>
      <button onClick={() => setCount(count + 1)}>Clicked {count} times</button>
    </div>
  );
}
"#;

const API_SOURCE: &str = r#"const express = require("express");
const router = express.Router();

const items = [];

router.get("/items", (req, res) => res.json(items));

router.post("/items", (req, res) => {
  const item = { id: items.length + 1, ...req.body };
  items.push(item);
  res.status(201).json(item);
});

module.exports = router;
"#;

const DATABASE_SOURCE: &str = r#"CREATE TABLE items (
    id          SERIAL PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_items_name ON items (name);
"#;

const HTML_SOURCE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Generated Page</title>
</head>
<body>
  <header><h1>Welcome</h1></header>
  <main><p>This page was generated from your plan step.</p></main>
</body>
</html>
"#;

const PYTHON_SOURCE: &str = r#"def main():
    tasks = ["plan", "build", "review"]
    for index, task in enumerate(tasks, start=1):
        print(f"{index}. {task}")


if __name__ == "__main__":
    main()
"#;

const JAVASCRIPT_SOURCE: &str = r#"function main() {
  const tasks = ["plan", "build", "review"];
  tasks.forEach((task, index) => console.log(`${index + 1}. ${task}`));
}

main();
"#;

const GENERAL_SOURCE: &str = "Implementation outline\n\
1. Gather requirements\n\
2. Prepare the working environment\n\
3. Implement the core functionality\n\
4. Test and review\n";

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn code_type_precedence() {
        assert_eq!(detect_code_type("Build a React dashboard"), CodeType::React);
        assert_eq!(detect_code_type("REST endpoint for orders"), CodeType::Api);
        assert_eq!(detect_code_type("design the SQL schema"), CodeType::Database);
        assert_eq!(detect_code_type("a landing page"), CodeType::Html);
        assert_eq!(detect_code_type("pandas report"), CodeType::Python);
        assert_eq!(detect_code_type("Node.js script"), CodeType::JavaScript);
        assert_eq!(detect_code_type("write a poem"), CodeType::General);
        // react is tested before api.
        assert_eq!(detect_code_type("react frontend for the api"), CodeType::React);
        assert_eq!(detect_code_type("Expose the orders API."), CodeType::Api);
        assert_eq!(detect_code_type("a UI for admins"), CodeType::React);
    }

    #[test]
    fn short_keywords_only_match_whole_words() {
        assert_eq!(detect_code_type("Build a Python data pipeline"), CodeType::Python);
        assert_eq!(detect_code_type("Write a guide to the SQL schema"), CodeType::Database);
        assert_eq!(detect_code_type("keep the stable branch green"), CodeType::General);
        assert_eq!(detect_code_type("raise capital from investors"), CodeType::General);
        assert_eq!(detect_code_type("track interest on the required loan"), CodeType::General);
        assert_eq!(
            detect_code_type(
                "Launch & Marketing: Build your brand, launch to your first customers, \
                 and run initial marketing campaigns. [mode: code_generation]"
            ),
            CodeType::General
        );
    }

    #[test]
    fn word_padding_collapses_punctuation() {
        assert_eq!(word_padded("REST api."), " REST api ");
        assert_eq!(word_padded("Node.js, fast!"), " Node js fast ");
        assert_eq!(word_padded(""), " ");
    }

    #[test]
    fn generated_code_has_file_path() {
        let out = generate_code("create database tables");
        assert_eq!(out.output_type, "code");
        assert_eq!(out.file_path.as_deref(), Some("db/schema.sql"));
        assert!(out.content.contains("CREATE TABLE"));
        assert!(out.success);
    }

    #[test]
    fn seeded_rng_makes_pool_choice_repeatable() {
        let a = script_output(&mut StdRng::seed_from_u64(7));
        let b = script_output(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(SCRIPT_POOL.contains(&a.content.as_str()));

        let api = api_call_output(&mut StdRng::seed_from_u64(3));
        assert_eq!(api.output_type, "api_response");
        assert!(API_POOL.contains(&api.content.as_str()));
    }

    #[test]
    fn file_creation_yields_one_row_per_file() {
        let mut rng = StdRng::seed_from_u64(0);
        let outputs = execution_outputs(ExecutionType::FileCreation, "todo app", &mut rng);
        let paths: Vec<_> = outputs.iter().filter_map(|o| o.file_path.as_deref()).collect();
        assert_eq!(paths, vec!["README.md", "package.json", "src/index.js"]);
        assert!(outputs[0].content.contains("todo app"));
    }

    #[test]
    fn each_execution_type_produces_output() {
        let mut rng = StdRng::seed_from_u64(1);
        for ty in [
            ExecutionType::CodeGeneration,
            ExecutionType::ScriptExecution,
            ExecutionType::ApiCall,
        ] {
            let outputs = execution_outputs(ty, "anything", &mut rng);
            assert_eq!(outputs.len(), 1, "{ty}");
        }
    }
}
