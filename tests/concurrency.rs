// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::thread;

use rand::Rng;
use rand::distr::Alphanumeric;
use tempfile::TempDir;
use tierlog::Logger;
use tierlog::Severity;
use tierlog::SizeUnit;
use tierlog::WriterConfig;

const THREADS: usize = 8;
const MESSAGES: usize = 250;

fn message(thread: usize, seq: usize, noise: &str) -> String {
    format!("thread-{thread}-msg-{seq}-{noise}")
}

fn generate_random_string() -> String {
    let mut rng = rand::rng();
    let len = rng.random_range(10..=60);
    std::iter::repeat(())
        .map(|()| rng.sample(Alphanumeric))
        .map(char::from)
        .take(len)
        .collect()
}

fn log_concurrently(logger: &Logger) -> HashSet<String> {
    thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                s.spawn(move || {
                    let mut sent = vec![];
                    for m in 0..MESSAGES {
                        let msg = message(t, m, &generate_random_string());
                        tierlog::key!(logger, "{msg}");
                        sent.push(msg);
                    }
                    sent
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    })
}

/// Every line of every file whose name starts with `prefix`, checked to be well formed.
fn collect_messages(dir: &Path, prefix: &str) -> Vec<String> {
    let mut messages = vec![];
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }
        let content = fs::read_to_string(entry.path()).unwrap();
        assert!(content.is_empty() || content.ends_with('\n'));
        for line in content.lines() {
            assert!(line.starts_with('['), "torn line: {line}");
            assert_eq!(line.matches("#KEY#").count(), 1, "interleaved line: {line}");
            let (_, msg) = line.split_once(" EM:").expect("line without message");
            messages.push(msg.to_string());
        }
    }
    messages
}

#[test]
fn test_concurrent_writers_never_interleave() {
    let temp_dir = TempDir::new().unwrap();
    let config = WriterConfig::builder(temp_dir.path(), "app")
        .rollover_size(5, 64, SizeUnit::MB)
        .without_monitor()
        .build()
        .unwrap();
    let logger = Logger::new(config);

    let sent = log_concurrently(&logger);
    assert_eq!(sent.len(), THREADS * MESSAGES);

    for severity in [Severity::Key, Severity::Error, Severity::Debug] {
        let prefix = format!("app_{}.log", severity.name());
        let written = collect_messages(temp_dir.path(), &prefix);
        assert_eq!(written.len(), THREADS * MESSAGES);
        let unique: HashSet<_> = written.into_iter().collect();
        assert_eq!(unique, sent);
    }
}

#[test]
fn test_concurrent_writers_with_rotation_and_monitor() {
    let temp_dir = TempDir::new().unwrap();
    let config = WriterConfig::builder(temp_dir.path(), "app")
        .min_level(Severity::Key)
        .rollover_size(200, 8, SizeUnit::KB)
        .monitor_interval(std::time::Duration::from_millis(1))
        .build()
        .unwrap();
    let logger = Logger::new(config);

    let sent = log_concurrently(&logger);
    drop(logger);

    let written = collect_messages(temp_dir.path(), "app_key.log");
    assert_eq!(written.len(), THREADS * MESSAGES);
    let unique: HashSet<_> = written.into_iter().collect();
    assert_eq!(unique, sent);
}
