use std::path::{Path, PathBuf};

use proptest::prelude::*;
use wado::watch::{DirMatcher, WatchPatterns};

/// One directory segment of a glob, plus a name it matches.
#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Star(String),
    Question(char),
    DoubleStar(Vec<String>),
}

impl Segment {
    fn glob(&self) -> String {
        match self {
            Segment::Literal(s) => s.clone(),
            Segment::Star(_) => "*".to_string(),
            Segment::Question(_) => "?".to_string(),
            Segment::DoubleStar(_) => "**".to_string(),
        }
    }

    fn names(&self) -> Vec<String> {
        match self {
            Segment::Literal(s) | Segment::Star(s) => vec![s.clone()],
            Segment::Question(c) => vec![c.to_string()],
            Segment::DoubleStar(dirs) => dirs.clone(),
        }
    }
}

fn name() -> impl Strategy<Value = String> {
    "[a-c]{1,3}"
}

fn segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        name().prop_map(Segment::Literal),
        name().prop_map(Segment::Star),
        prop::char::range('a', 'c').prop_map(Segment::Question),
        prop::collection::vec(name(), 0..3).prop_map(Segment::DoubleStar),
    ]
}

/// A glob relative to `/w` and a file path it matches.
fn glob_and_file() -> impl Strategy<Value = (String, PathBuf)> {
    (prop::collection::vec(segment(), 0..4), name()).prop_map(|(segments, stem)| {
        let mut glob_parts: Vec<String> = segments.iter().map(Segment::glob).collect();
        glob_parts.push("*.go".to_string());

        let mut path = PathBuf::from("/w");
        for seg in &segments {
            for dir in seg.names() {
                path.push(dir);
            }
        }
        path.push(format!("{stem}.go"));
        (glob_parts.join("/"), path)
    })
}

proptest! {
    #[test]
    fn every_ancestor_of_a_match_could_contain_a_match((glob, file) in glob_and_file()) {
        let base = Path::new("/w");
        let compiled = WatchPatterns::new([glob.as_str()], Vec::<String>::new())
            .with_base(base)
            .compile()
            .unwrap();
        prop_assume!(compiled.matches_file(&file));

        let matcher = DirMatcher::new(&glob, base).unwrap();
        let mut dir = file.parent();
        while let Some(d) = dir.filter(|d| d.starts_with(base)) {
            prop_assert!(
                matcher.could_contain_match(d),
                "{} rejected ancestor {} of {}",
                glob,
                d.display(),
                file.display()
            );
            prop_assert!(compiled.could_contain_match(d));
            dir = d.parent();
        }
    }

    #[test]
    fn exclusion_wins_over_inclusion((glob, file) in glob_and_file()) {
        let base = Path::new("/w");
        let stem = file.file_stem().unwrap().to_string_lossy().into_owned();

        let include_only = WatchPatterns::new([glob.as_str()], Vec::<String>::new())
            .with_base(base)
            .compile()
            .unwrap();
        prop_assume!(include_only.matches_file(&file));

        let excluded = WatchPatterns::new([glob.as_str()], [format!("**/{stem}.go")])
            .with_base(base)
            .compile()
            .unwrap();
        prop_assert!(!excluded.matches_file(&file));
    }
}
