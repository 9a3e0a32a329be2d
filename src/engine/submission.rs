use crate::error::{Error, Result};
use crate::model::{AccessToken, BallotPayload};
use crate::service::ElectionService;

/// Send a ballot's vote requests one at a time, in payload order, stopping at
/// the first failure. Returns the number of requests the service accepted.
///
/// There is no rollback: if a ranked ballot fails part way, the ranks already
/// accepted stay recorded upstream.
pub async fn submit<S>(
    service: &S,
    payload: &BallotPayload,
    credential: Option<&AccessToken>,
) -> Result<usize>
where
    S: ElectionService + ?Sized,
{
    let total = payload.votes.len();
    for (accepted, vote) in payload.votes.iter().enumerate() {
        if let Err(err) = service
            .cast_vote(payload.election_id, vote, credential)
            .await
        {
            if accepted > 0 {
                warn!(
                    "Election {} partially recorded: {accepted} of {total} ranks accepted before failure",
                    payload.election_id
                );
            }
            return Err(Error::Submission {
                accepted,
                total,
                source: Box::new(err),
            });
        }
    }
    info!(
        "Recorded {total} vote request{} for election {}",
        if total != 1 { "s" } else { "" },
        payload.election_id
    );
    Ok(total)
}
