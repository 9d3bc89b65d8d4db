use crate::job::JobStatus;

/// The store key for a job record by id
pub fn job_key(uuid: &str) -> String {
    format!("jobs/{uuid}")
}

/// Secondary index entry for a job, ordered by status then id.
/// Value at this key is the job's uuid.
pub fn status_key(status: JobStatus, uuid: &str) -> String {
    format!("status/{}/{}", status.as_str(), uuid)
}

/// Prefix covering all index entries for one status
pub fn status_prefix(status: JobStatus) -> String {
    format!("status/{}/", status.as_str())
}

/// Exclusive upper bound for a prefix scan: the prefix with its last byte
/// incremented (trailing 0xff bytes are dropped first).
pub fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(&last) = end.last() {
        if last == 0xff {
            end.pop();
        } else {
            *end.last_mut().unwrap() = last + 1;
            return end;
        }
    }
    // Prefix was all 0xff; scan to the end of the keyspace
    vec![0xff; prefix.len() + 1]
}
