use crate::types::{ProtocolSelector, Task};

/// Expand hosts × ports × protocols into the ordered task list.
///
/// Host-major, port-minor; with `Both`, each pair yields its TCP task before its UDP task.
/// Inputs are taken as given: no host de-duplication happens here.
pub fn make_tasks(hosts: &[String], ports: &[u16], selector: ProtocolSelector) -> Vec<Task> {
    let protocols = selector.protocols();
    let mut tasks = Vec::with_capacity(hosts.len() * ports.len() * protocols.len());
    for host in hosts {
        for &port in ports {
            for &protocol in protocols {
                tasks.push(Task::new(host.clone(), port, protocol));
            }
        }
    }
    tasks
}
