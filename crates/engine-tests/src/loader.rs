#[cfg(test)]
mod tests {
    use crate::{
        graph::{Failure, ScriptedGraph},
        utils::{ids, people_tsv, tsv_source},
    };
    use engine_core::{
        binder::ParameterBinder,
        error::{BindError, LoadError, WriteError},
        loader::BulkLoader,
        metrics::Metrics,
        partition::ChunkPartitioner,
        settings::LoaderSettings,
    };
    use model::{
        pagination::offset::Offset,
        records::row::{Header, Record},
    };
    use serde_json::json;
    use std::num::NonZeroUsize;
    use tracing_test::traced_test;

    const QUERY: &str = "UNWIND $rows AS row MERGE (p:Person {id: row.id}) SET p.name = row.name";

    fn settings(chunk_size: usize) -> LoaderSettings {
        LoaderSettings::default().with_chunk_size(chunk_size).unwrap()
    }

    // Three records, chunk size two: two transactions, the second holding the remainder.
    #[traced_test]
    #[tokio::test]
    async fn chunked_writes_follow_source_order() {
        let graph = ScriptedGraph::new();
        let summary = BulkLoader::new(graph.clone(), QUERY, settings(2))
            .run(tsv_source("id\tname\n1\tAda\n2\tGrace\n3\tEdsger\n", 0))
            .await
            .unwrap();

        assert_eq!(graph.write_attempts(), 2);
        assert_eq!(
            graph.committed(),
            vec![
                vec![
                    json!({"id": "1", "name": "Ada"}),
                    json!({"id": "2", "name": "Grace"})
                ],
                vec![json!({"id": "3", "name": "Edsger"})],
            ]
        );
        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.rows_committed, 3);
        assert!(logs_contain("Chunk committed"));
    }

    // A short record fails its chunk before the chunk is submitted.
    #[traced_test]
    #[tokio::test]
    async fn short_record_fails_before_its_chunk_is_written() {
        let graph = ScriptedGraph::new();
        let err = BulkLoader::new(graph.clone(), QUERY, settings(2))
            .run(tsv_source("id\tname\n1\tAda\n2\n", 0))
            .await
            .unwrap_err();

        match &err {
            LoadError::FieldCountMismatch {
                source:
                    BindError::FieldCountMismatch {
                        offset,
                        expected,
                        found,
                        ..
                    },
                resume,
            } => {
                assert_eq!(*offset, Offset::new(1));
                assert_eq!((*expected, *found), (2, 1));
                assert_eq!(resume.offset, Offset::ZERO);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(graph.write_attempts(), 0);
    }

    #[tokio::test]
    async fn mismatch_in_later_chunk_keeps_earlier_commits() {
        let graph = ScriptedGraph::new();
        let err = BulkLoader::new(graph.clone(), QUERY, settings(2))
            .run(tsv_source("id\tname\n1\ta\n2\tb\n3\tc\td\n4\te\n", 0))
            .await
            .unwrap_err();

        assert_eq!(err.resume().offset, Offset::new(2));
        assert_eq!(graph.committed_ids(), ids(1..=2));
    }

    // A blank line is a one-field record, never silently dropped.
    #[tokio::test]
    async fn blank_line_fails_with_field_count_mismatch() {
        let graph = ScriptedGraph::new();
        let err = BulkLoader::new(graph.clone(), QUERY, settings(5000))
            .run(tsv_source("id\tname\n1\ta\n\n2\tb\n", 0))
            .await
            .unwrap_err();

        match &err {
            LoadError::FieldCountMismatch {
                source: BindError::FieldCountMismatch { offset, found, .. },
                resume,
            } => {
                assert_eq!(*offset, Offset::new(1));
                assert_eq!(offset.line_index(), 2);
                assert_eq!(*found, 1);
                assert_eq!(resume.offset, Offset::ZERO);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(graph.write_attempts(), 0);
    }

    // Start offset 5000 on 10000 records skips exactly the first half.
    #[tokio::test]
    async fn start_offset_skips_records_after_the_header() {
        let graph = ScriptedGraph::new();
        let metrics = Metrics::new();
        let summary = BulkLoader::new(graph.clone(), QUERY, settings(1000))
            .with_metrics(metrics.clone())
            .run(tsv_source(&people_tsv(10_000), 5000))
            .await
            .unwrap();

        assert_eq!(summary.skipped, 5000);
        assert_eq!(summary.rows_committed, 5000);
        assert_eq!(summary.end_offset, Offset::new(10_000));
        assert_eq!(graph.committed_ids(), ids(5001..=10_000));
        assert_eq!(metrics.snapshot().records_skipped, 5000);
        assert_eq!(metrics.snapshot().chunks_committed, 5);
    }

    // Third of five chunks fails: the two committed chunks set the resume offset.
    #[traced_test]
    #[tokio::test]
    async fn failed_chunk_resumes_after_last_commit() {
        let graph = ScriptedGraph::new();
        graph.fail_write(3, Failure::Timeout);

        let err = BulkLoader::new(graph.clone(), QUERY, settings(1000))
            .run(tsv_source(&people_tsv(5000), 0))
            .await
            .unwrap_err();

        let LoadError::TransactionFailure { source, resume } = &err else {
            panic!("unexpected error: {err:?}");
        };
        let WriteError::TransactionFailure { chunk, last_row, .. } = source else {
            panic!("unexpected write error: {source:?}");
        };
        assert_eq!(*chunk, 3);
        assert_eq!(last_row.get("id"), Some("3000"));
        assert_eq!(resume.offset, Offset::new(2000));
        assert_eq!(resume.line_index, 2001);
        assert_eq!(graph.committed_ids(), ids(1..=2000));
        assert!(logs_contain("resume_offset=2000"));
    }

    // Re-running from the reported offset commits exactly the missing suffix.
    #[tokio::test]
    async fn restart_from_resume_offset_completes_the_load() {
        let content = people_tsv(5000);
        let graph = ScriptedGraph::new();
        graph.fail_write(3, Failure::Query);

        let loader = BulkLoader::new(graph.clone(), QUERY, settings(1000));
        let resume = loader
            .run(tsv_source(&content, 0))
            .await
            .unwrap_err()
            .resume()
            .offset;
        let summary = loader
            .run(tsv_source(&content, resume.get()))
            .await
            .unwrap();

        assert_eq!(summary.skipped, 2000);
        assert_eq!(summary.rows_committed, 3000);
        assert_eq!(graph.committed_ids(), ids(1..=5000));
    }

    #[tokio::test]
    async fn resume_offset_never_exceeds_committed_records() {
        let chunk_size = 7;
        let records: usize = 40;
        let chunks = records.div_ceil(chunk_size);

        for start in [0u64, 3] {
            for failing in 1..=chunks {
                let graph = ScriptedGraph::new();
                graph.fail_write(failing, Failure::Query);
                let err = BulkLoader::new(graph.clone(), QUERY, settings(chunk_size))
                    .run(tsv_source(&people_tsv(records as u64 + start), start))
                    .await
                    .unwrap_err();

                let committed = graph.committed_ids().len() as u64;
                assert_eq!(committed, ((failing - 1) * chunk_size) as u64);
                assert_eq!(err.resume().offset, Offset::new(start + committed));
            }
        }
    }

    #[test]
    fn chunks_cover_the_stream_exactly() {
        for (records, size) in [(0u64, 3usize), (1, 1), (10, 3), (12, 4), (12_345, 5000)] {
            let input =
                (0..records).map(|i| Ok::<_, ()>(Record::new(Offset::new(i), vec![i.to_string()])));
            let chunks: Vec<_> = ChunkPartitioner::new(input, NonZeroUsize::new(size).unwrap())
                .collect::<Result<_, _>>()
                .unwrap();

            assert_eq!(chunks.len() as u64, records.div_ceil(size as u64));
            for (i, chunk) in chunks.iter().enumerate() {
                if i + 1 < chunks.len() {
                    assert_eq!(chunk.len(), size);
                } else {
                    let expected = records - size as u64 * ((records - 1) / size as u64);
                    assert_eq!(chunk.len() as u64, expected);
                }
            }

            let offsets: Vec<u64> = chunks
                .iter()
                .flat_map(|c| c.records.iter().map(|r| r.offset.get()))
                .collect();
            assert_eq!(offsets, (0..records).collect::<Vec<_>>());
        }
    }

    #[test]
    fn binder_accepts_only_matching_field_counts() {
        let header = Header::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        let binder = ParameterBinder::new(header);

        for len in 0..6 {
            let record = Record::new(Offset::ZERO, vec![String::from("x"); len]);
            let result = binder.bind(record);
            if len == 3 {
                let row = result.unwrap();
                assert_eq!(row.iter().count(), 3);
            } else {
                assert!(matches!(
                    result,
                    Err(BindError::FieldCountMismatch { expected: 3, found, .. }) if found == len
                ));
            }
        }
    }
}
